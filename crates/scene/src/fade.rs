use crate::SceneGraph;
use crate::entity::{MaterialId, NodeId};

/// Remembers the authored opacity of every material under a set of roots so a
/// whole layer can be faded by one factor without losing the originals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fade {
    entries: Vec<(MaterialId, f32)>,
}

impl Fade {
    pub fn collect(scene: &SceneGraph, roots: &[NodeId]) -> Self {
        let mut entries: Vec<(MaterialId, f32)> = Vec::new();
        let mut stack: Vec<NodeId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            let Some(node) = scene.node(id) else {
                continue;
            };
            if let Some(mesh) = node.mesh() {
                let seen = entries.iter().any(|(m, _)| *m == mesh.material);
                if !seen {
                    if let Some(material) = scene.material(mesh.material) {
                        entries.push((mesh.material, material.opacity));
                    }
                }
            }
            stack.extend(node.children().iter().copied());
        }
        Self { entries }
    }

    /// Adds materials from `other` that this fade does not track yet.
    pub fn merge(&mut self, other: Fade) {
        for entry in other.entries {
            if !self.entries.iter().any(|(m, _)| *m == entry.0) {
                self.entries.push(entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets every material to `authored * factor`. Released materials are skipped.
    pub fn apply(&self, scene: &mut SceneGraph, factor: f64) {
        let factor = factor.clamp(0.0, 1.0) as f32;
        for (id, authored) in &self.entries {
            if let Some(material) = scene.material_mut(*id) {
                material.set_opacity(authored * factor);
            }
        }
    }
}
