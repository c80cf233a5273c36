use foundation::math::Vec3;

use crate::components::{Color, Geometry, Material};
use crate::entity::NodeId;
use crate::{SceneError, SceneGraph, Source};

#[derive(Debug, Clone, PartialEq)]
pub struct PlanetStyle {
    pub orbit_radius: f64,
    pub radius: f64,
    pub color: Color,
    /// Radians per second.
    pub angular_speed: f64,
    pub phase: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarSystemStyle {
    pub center: Vec3,
    pub sun_radius: f64,
    pub sun_color: Color,
    pub orbit_color: Color,
    pub orbit_opacity: f32,
    pub planets: Vec<PlanetStyle>,
}

impl Default for SolarSystemStyle {
    fn default() -> Self {
        let planet = |orbit_radius, radius, hex, angular_speed, phase| PlanetStyle {
            orbit_radius,
            radius,
            color: Color::from_hex(hex),
            angular_speed,
            phase,
        };
        Self {
            center: Vec3::new(0.0, 0.0, -6.0),
            sun_radius: 0.9,
            sun_color: Color::from_hex(0xffc26b),
            orbit_color: Color::from_hex(0x60e4ff),
            orbit_opacity: 0.2,
            planets: vec![
                planet(1.6, 0.08, 0x9aa4b1, 0.9, 0.3),
                planet(2.3, 0.12, 0xe0b46c, 0.6, 2.1),
                planet(3.1, 0.14, 0x3bb9ff, 0.45, 4.0),
                planet(4.2, 0.11, 0xd46a4c, 0.3, 5.2),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarSystemPrefab {
    pub group: NodeId,
    pub sun: NodeId,
    pub planets: Vec<NodeId>,
    pub orbits: NodeId,
    styles: Vec<PlanetStyle>,
}

impl SolarSystemPrefab {
    /// Moves every planet along its orbit to where it is at `time_s`.
    pub fn animate(&self, scene: &mut SceneGraph, time_s: f64) {
        for (node, style) in self.planets.iter().zip(&self.styles) {
            if let Some(n) = scene.node_mut(*node) {
                let angle = style.phase + time_s * style.angular_speed;
                n.transform.position = orbit_point(style.orbit_radius, angle);
            }
        }
    }
}

fn orbit_point(radius: f64, angle: f64) -> Vec3 {
    Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
}

/// Closed circle in the XZ plane as a line list.
pub fn orbit_ring(radius: f64, samples: u32) -> Vec<[Vec3; 2]> {
    let samples = samples.max(3);
    (0..samples)
        .map(|i| {
            let a0 = i as f64 / samples as f64 * std::f64::consts::TAU;
            let a1 = (i + 1) as f64 / samples as f64 * std::f64::consts::TAU;
            [orbit_point(radius, a0), orbit_point(radius, a1)]
        })
        .collect()
}

pub fn spawn_solar_system(
    scene: &mut SceneGraph,
    parent: Option<NodeId>,
    style: &SolarSystemStyle,
) -> Result<SolarSystemPrefab, SceneError> {
    let group = scene.spawn(parent, "solar")?;
    if let Some(n) = scene.node_mut(group) {
        n.transform.position = style.center;
    }

    let sun = scene.spawn_mesh(
        Some(group),
        "solar.sun",
        Source::Own(Geometry::sphere(style.sun_radius, 32)),
        Source::Own(Material::unlit(style.sun_color, 1.0)),
    )?;

    let segments = style
        .planets
        .iter()
        .flat_map(|p| orbit_ring(p.orbit_radius, 96))
        .collect();
    let orbits = scene.spawn_mesh(
        Some(group),
        "solar.orbits",
        Source::Own(Geometry::LineSegments { segments }),
        Source::Own(Material::line(style.orbit_color, style.orbit_opacity)),
    )?;

    let mut planets = Vec::with_capacity(style.planets.len());
    for (i, planet) in style.planets.iter().enumerate() {
        let node = scene.spawn_mesh(
            Some(group),
            format!("solar.planet.{i}"),
            Source::Own(Geometry::sphere(planet.radius, 16)),
            Source::Own(Material::lit(planet.color, Color::rgb(0.0, 0.0, 0.0))),
        )?;
        if let Some(n) = scene.node_mut(node) {
            n.transform.position = orbit_point(planet.orbit_radius, planet.phase);
        }
        planets.push(node);
    }

    Ok(SolarSystemPrefab {
        group,
        sun,
        planets,
        orbits,
        styles: style.planets.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::{SolarSystemStyle, orbit_ring, spawn_solar_system};
    use crate::SceneGraph;

    #[test]
    fn planets_stay_on_their_orbits() {
        let mut scene = SceneGraph::new();
        let style = SolarSystemStyle::default();
        let solar = spawn_solar_system(&mut scene, None, &style).expect("solar");
        assert_eq!(solar.planets.len(), style.planets.len());

        solar.animate(&mut scene, 3.25);
        for (node, planet) in solar.planets.iter().zip(&style.planets) {
            let local = scene.node(*node).expect("planet").transform.position;
            assert!((local.length() - planet.orbit_radius).abs() < 1e-9);
        }
    }

    #[test]
    fn orbit_ring_is_closed() {
        let ring = orbit_ring(2.0, 8);
        assert_eq!(ring.len(), 8);
        assert!(ring[7][1].distance(ring[0][0]) < 1e-12);
    }
}
