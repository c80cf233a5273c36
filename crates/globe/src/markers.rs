use formats::CaseRecord;
use foundation::math::{Vec3, lat_lon_to_vec3};
use scene::components::{Color, Geometry, Material};
use scene::{GeometryId, NodeId, SceneError, SceneGraph, Source};
use tracing::debug;

use crate::config::MarkerConfig;

/// One plotted case. `position` is in the globe group's frame and fixed for
/// the marker's lifetime.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Marker {
    pub node: NodeId,
    pub position: Vec3,
    pub phase: f64,
    pub record: usize,
}

/// Owns the markers and maps picked nodes back to their case records.
///
/// All markers share one sphere geometry; each gets its own material so the
/// intro can fade them with the rest of the globe.
#[derive(Debug, Clone)]
pub struct MarkerRegistry {
    group: NodeId,
    geometry: GeometryId,
    records: Vec<CaseRecord>,
    markers: Vec<Marker>,
    pulse_amplitude: f64,
    pulse_frequency: f64,
}

impl MarkerRegistry {
    /// Spawns one marker per record, in input order, under `parent`.
    pub fn build(
        scene: &mut SceneGraph,
        parent: NodeId,
        records: Vec<CaseRecord>,
        config: &MarkerConfig,
        globe_radius: f64,
    ) -> Result<Self, SceneError> {
        let group = scene.spawn(Some(parent), "markers")?;
        let geometry = scene.add_shared_geometry(Geometry::sphere(config.radius, config.segments));
        let color = Color::from_hex(config.color);
        let altitude = globe_radius + config.altitude;

        let mut markers = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let position = lat_lon_to_vec3(record.lat_deg(), record.lon_deg(), altitude);
            let node = scene.spawn_mesh(
                Some(group),
                format!("marker.{}", record.id),
                Source::Share(geometry),
                Source::Own(Material::lit(color, color)),
            )?;
            if let Some(n) = scene.node_mut(node) {
                n.transform.position = position;
            }
            markers.push(Marker {
                node,
                position,
                phase: i as f64 * config.phase_step,
                record: i,
            });
        }
        debug!(count = markers.len(), "markers.build");

        Ok(Self {
            group,
            geometry,
            records,
            markers,
            pulse_amplitude: config.pulse_amplitude,
            pulse_frequency: config.pulse_frequency,
        })
    }

    pub fn group(&self) -> NodeId {
        self.group
    }

    pub fn geometry(&self) -> GeometryId {
        self.geometry
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn marker(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn record(&self, index: usize) -> Option<&CaseRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    /// Marker nodes in record order, the hit-test candidate list.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.markers.iter().map(|m| m.node).collect()
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.markers.iter().position(|m| m.node == node)
    }

    pub fn resolve(&self, node: NodeId) -> Option<&CaseRecord> {
        self.index_of(node).and_then(|i| self.records.get(i))
    }

    pub fn pulse_scale(&self, index: usize, time_s: f64) -> f64 {
        let phase = self.markers.get(index).map_or(0.0, |m| m.phase);
        1.0 + self.pulse_amplitude * (time_s * self.pulse_frequency + phase).sin()
    }

    /// Sets every marker's scale for `time_s`.
    pub fn pulse(&self, scene: &mut SceneGraph, time_s: f64) {
        for (i, marker) in self.markers.iter().enumerate() {
            let scale = self.pulse_scale(i, time_s);
            if let Some(n) = scene.node_mut(marker.node) {
                n.transform.scale = Vec3::splat(scale);
            }
        }
    }
}
