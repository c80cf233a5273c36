use foundation::math::Vec3;

use super::hash01;
use crate::components::{Color, Geometry, Material};
use crate::entity::NodeId;
use crate::{SceneError, SceneGraph, Source};

const SALT_RADIUS: u32 = 0x68bc_21eb;
const SALT_THETA: u32 = 0x02e5_be93;
const SALT_PHI: u32 = 0x9e37_79b9;
const SALT_SHADE: u32 = 0x5bd1_e995;

#[derive(Debug, Clone, PartialEq)]
pub struct StarfieldStyle {
    pub count: u32,
    pub min_radius: f64,
    pub max_radius: f64,
    pub color: Color,
    pub opacity: f32,
    pub point_size: f32,
    pub seed: u32,
}

impl Default for StarfieldStyle {
    fn default() -> Self {
        Self {
            count: 600,
            min_radius: 12.0,
            max_radius: 22.0,
            color: Color::from_hex(0x6dd6ff),
            opacity: 0.6,
            point_size: 2.0,
            seed: 1,
        }
    }
}

/// Points uniformly distributed over a spherical shell.
pub fn star_positions(count: u32, min_radius: f64, max_radius: f64, seed: u32) -> Vec<Vec3> {
    let span = (max_radius - min_radius).max(0.0);
    (0..count)
        .map(|i| {
            let r = min_radius + hash01(seed, SALT_RADIUS, i) * span;
            let theta = hash01(seed, SALT_THETA, i) * std::f64::consts::TAU;
            let phi = (2.0 * hash01(seed, SALT_PHI, i) - 1.0).clamp(-1.0, 1.0).acos();
            Vec3::new(
                r * phi.sin() * theta.cos(),
                r * phi.sin() * theta.sin(),
                r * phi.cos(),
            )
        })
        .collect()
}

pub fn spawn_starfield(
    scene: &mut SceneGraph,
    parent: Option<NodeId>,
    style: &StarfieldStyle,
) -> Result<NodeId, SceneError> {
    let positions = star_positions(style.count, style.min_radius, style.max_radius, style.seed);
    let colors = (0..style.count)
        .map(|i| {
            let shade = 0.6 + 0.4 * hash01(style.seed, SALT_SHADE, i) as f32;
            [shade, shade, shade]
        })
        .collect();
    let node = scene.spawn_mesh(
        parent,
        "starfield",
        Source::Own(Geometry::Points { positions, colors }),
        Source::Own(Material::points(style.color, style.opacity, style.point_size)),
    )?;
    if let Some(n) = scene.node_mut(node) {
        n.render_order = -100;
    }
    Ok(node)
}

/// Spiral galaxy seen during the wide-field part of the intro.
#[derive(Debug, Clone, PartialEq)]
pub struct GalaxyStyle {
    pub count: u32,
    pub arms: u32,
    pub radius: f64,
    pub thickness: f64,
    /// Radians of twist from the core to the rim.
    pub twist: f64,
    pub center: Vec3,
    pub tilt_rad: f64,
    pub core_color: Color,
    pub rim_color: Color,
    pub opacity: f32,
    pub point_size: f32,
    pub seed: u32,
}

impl Default for GalaxyStyle {
    fn default() -> Self {
        Self {
            count: 4000,
            arms: 3,
            radius: 14.0,
            thickness: 0.6,
            twist: 5.0,
            center: Vec3::ZERO,
            tilt_rad: 0.45,
            core_color: Color::from_hex(0xffe3b0),
            rim_color: Color::from_hex(0x3bb9ff),
            opacity: 0.9,
            point_size: 1.5,
            seed: 7,
        }
    }
}

pub fn galaxy_points(style: &GalaxyStyle) -> (Vec<Vec3>, Vec<[f32; 3]>) {
    let arms = style.arms.max(1);
    let mut positions = Vec::with_capacity(style.count as usize);
    let mut colors = Vec::with_capacity(style.count as usize);
    for i in 0..style.count {
        // Squared radius keeps the core dense.
        let u = hash01(style.seed, SALT_RADIUS, i);
        let r = style.radius * u * u;
        let arm = (i % arms) as f64 / arms as f64 * std::f64::consts::TAU;
        let jitter = (hash01(style.seed, SALT_THETA, i) - 0.5) * 0.5;
        let angle = arm + u * style.twist + jitter;
        let spread = (hash01(style.seed, SALT_PHI, i) - 0.5) * style.thickness * (1.0 - u);

        positions.push(Vec3::new(
            r * angle.cos(),
            spread,
            r * angle.sin(),
        ));

        let t = u as f32;
        let c0 = style.core_color;
        let c1 = style.rim_color;
        colors.push([
            c0.r + (c1.r - c0.r) * t,
            c0.g + (c1.g - c0.g) * t,
            c0.b + (c1.b - c0.b) * t,
        ]);
    }
    (positions, colors)
}

pub fn spawn_galaxy(
    scene: &mut SceneGraph,
    parent: Option<NodeId>,
    style: &GalaxyStyle,
) -> Result<NodeId, SceneError> {
    let (positions, colors) = galaxy_points(style);
    let node = scene.spawn_mesh(
        parent,
        "galaxy",
        Source::Own(Geometry::Points { positions, colors }),
        Source::Own(Material::points(Color::WHITE, style.opacity, style.point_size)),
    )?;
    if let Some(n) = scene.node_mut(node) {
        n.transform.position = style.center;
        n.transform.rotation =
            foundation::math::Quat::from_axis_angle(Vec3::X, style.tilt_rad);
        n.render_order = -50;
    }
    Ok(node)
}
