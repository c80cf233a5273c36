use foundation::math::{Quat, Vec3, lat_lon_to_vec3};

use crate::components::{Color, Geometry, Material};
use crate::entity::NodeId;
use crate::{SceneError, SceneGraph, Source};

#[derive(Debug, Clone, PartialEq)]
pub struct GlobeStyle {
    pub radius: f64,
    pub segments: u32,
    /// Rotation about +Y applied to the whole globe group.
    pub rotation_offset_rad: f64,
    pub surface_color: Color,
    pub surface_emissive: Color,
    pub wireframe_color: Color,
    pub wireframe_opacity: f32,
    pub graticule_step_deg: f64,
    pub atmosphere_color: Color,
    pub atmosphere_scale: f64,
    pub atmosphere_opacity: f32,
}

impl Default for GlobeStyle {
    fn default() -> Self {
        Self {
            radius: 1.55,
            segments: 96,
            rotation_offset_rad: -std::f64::consts::FRAC_PI_2,
            surface_color: Color::from_hex(0x0a1524),
            surface_emissive: Color::from_hex(0x0b1f33),
            wireframe_color: Color::from_hex(0x1d4761),
            wireframe_opacity: 0.25,
            graticule_step_deg: 15.0,
            atmosphere_color: Color::from_hex(0x3bb9ff),
            atmosphere_scale: 1.04,
            atmosphere_opacity: 0.18,
        }
    }
}

/// Node ids of a spawned globe. Markers and outlines are parented to `group`
/// so they follow its rotation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlobePrefab {
    pub group: NodeId,
    pub surface: NodeId,
    pub wireframe: NodeId,
    pub atmosphere: NodeId,
}

pub fn spawn_globe(scene: &mut SceneGraph, style: &GlobeStyle) -> Result<GlobePrefab, SceneError> {
    let group = scene.spawn(None, "globe")?;
    if let Some(node) = scene.node_mut(group) {
        node.transform.rotation = Quat::from_rotation_y(style.rotation_offset_rad);
    }

    let surface = scene.spawn_mesh(
        Some(group),
        "globe.surface",
        Source::Own(Geometry::sphere(style.radius, style.segments)),
        Source::Own(Material::lit(style.surface_color, style.surface_emissive)),
    )?;

    let wireframe = scene.spawn_mesh(
        Some(group),
        "globe.wireframe",
        Source::Own(Geometry::LineSegments {
            segments: graticule_segments(style.radius * 1.001, style.graticule_step_deg, 96),
        }),
        Source::Own(Material::line(style.wireframe_color, style.wireframe_opacity)),
    )?;

    let atmosphere = scene.spawn_mesh(
        Some(group),
        "globe.atmosphere",
        Source::Own(Geometry::sphere(
            style.radius * style.atmosphere_scale,
            style.segments,
        )),
        Source::Own(Material::back_face(
            style.atmosphere_color,
            style.atmosphere_opacity,
        )),
    )?;
    if let Some(node) = scene.node_mut(atmosphere) {
        node.render_order = 10;
    }

    Ok(GlobePrefab {
        group,
        surface,
        wireframe,
        atmosphere,
    })
}

/// Meridians and parallels every `step_deg`, sampled `samples` times each,
/// as a line list on a sphere of `radius`. Poles are left out of the parallels.
pub fn graticule_segments(radius: f64, step_deg: f64, samples: u32) -> Vec<[Vec3; 2]> {
    let step = step_deg.clamp(1.0, 90.0);
    let samples = samples.max(2);
    let mut out = Vec::new();

    let mut push_path = |points: &mut dyn Iterator<Item = Vec3>| {
        let mut prev: Option<Vec3> = None;
        for p in points {
            if let Some(q) = prev {
                out.push([q, p]);
            }
            prev = Some(p);
        }
    };

    let mut lon = -180.0;
    while lon < 180.0 - 1e-9 {
        push_path(&mut (0..=samples).map(|i| {
            let lat = -90.0 + 180.0 * i as f64 / samples as f64;
            lat_lon_to_vec3(lat, lon, radius)
        }));
        lon += step;
    }

    let mut lat = -90.0 + step;
    while lat < 90.0 - 1e-9 {
        push_path(&mut (0..=samples).map(|i| {
            let lon = -180.0 + 360.0 * i as f64 / samples as f64;
            lat_lon_to_vec3(lat, lon, radius)
        }));
        lat += step;
    }
    out
}
