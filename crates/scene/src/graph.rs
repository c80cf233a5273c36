use foundation::arena::Arena;
use foundation::math::{Mat4, Vec3};
use tracing::debug;

use crate::components::{Geometry, Material, Transform};
use crate::entity::{GeometryId, MaterialId, NodeId};

/// Who is responsible for releasing a geometry or material.
///
/// - `Exclusive(node)`: released together with `node`.
/// - `Shared`: referenced by any number of nodes and released only by
///   [`SceneGraph::release_unused_shared`] or [`SceneGraph::dispose_all`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ownership {
    Exclusive(NodeId),
    Shared,
}

/// Resource argument for [`SceneGraph::spawn_mesh`]: either a new value the
/// node will own, or a reference to an existing shared resource.
#[derive(Debug, Clone)]
pub enum Source<T, Id> {
    Own(T),
    Share(Id),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Mesh {
    pub geometry: GeometryId,
    pub material: MaterialId,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    /// Lower values draw first within a render pass.
    pub render_order: i32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    mesh: Option<Mesh>,
}

impl Node {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            transform: Transform::identity(),
            visible: true,
            render_order: 0,
            parent,
            children: Vec::new(),
            mesh: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn mesh(&self) -> Option<Mesh> {
        self.mesh
    }
}

#[derive(Debug)]
struct Owned<T> {
    value: T,
    ownership: Ownership,
}

/// A resource that left the graph. Render backends drain these to free the
/// matching GPU buffers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Released {
    Node(NodeId),
    Geometry(GeometryId),
    Material(MaterialId),
}

/// Counts of resources released by one removal.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DisposalReport {
    pub nodes: usize,
    pub geometries: usize,
    pub materials: usize,
}

impl DisposalReport {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.nodes + self.geometries + self.materials
    }

    pub fn merge(&mut self, other: DisposalReport) {
        self.nodes += other.nodes;
        self.geometries += other.geometries;
        self.materials += other.materials;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SceneError {
    UnknownNode(NodeId),
    UnknownGeometry(GeometryId),
    UnknownMaterial(MaterialId),
    /// A resource owned by another node was passed as [`Source::Share`].
    NotShared,
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::UnknownNode(id) => write!(f, "unknown node {}", id.index()),
            SceneError::UnknownGeometry(id) => write!(f, "unknown geometry {}", id.index()),
            SceneError::UnknownMaterial(id) => write!(f, "unknown material {}", id.index()),
            SceneError::NotShared => write!(f, "resource is exclusively owned by another node"),
        }
    }
}

impl std::error::Error for SceneError {}

/// A node that should be drawn this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VisibleMesh {
    pub node: NodeId,
    pub world: Mat4,
    pub mesh: Mesh,
    pub render_order: i32,
}

/// Arena-backed scene graph.
///
/// Nodes, geometries and materials live in three generational arenas and refer
/// to each other by id only. Parent/child links are plain ids kept in sync by
/// the graph; there is no shared ownership.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Arena<Node>,
    roots: Vec<NodeId>,
    geometries: Arena<Owned<Geometry>>,
    materials: Arena<Owned<Material>>,
    released: Vec<Released>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.geometries.is_empty() && self.materials.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Adds an empty node (a group) under `parent`, or as a root.
    pub fn spawn(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
    ) -> Result<NodeId, SceneError> {
        if let Some(p) = parent {
            if !self.nodes.contains(p.0) {
                return Err(SceneError::UnknownNode(p));
            }
        }
        let id = NodeId(self.nodes.insert(Node::new(name.into(), parent)));
        match parent.and_then(|p| self.nodes.get_mut(p.0)) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Adds a drawable node. Owned sources become exclusive to the new node.
    pub fn spawn_mesh(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        geometry: Source<Geometry, GeometryId>,
        material: Source<Material, MaterialId>,
    ) -> Result<NodeId, SceneError> {
        if let Source::Share(id) = &geometry {
            match self.geometries.get(id.0) {
                None => return Err(SceneError::UnknownGeometry(*id)),
                Some(g) if g.ownership != Ownership::Shared => return Err(SceneError::NotShared),
                Some(_) => {}
            }
        }
        if let Source::Share(id) = &material {
            match self.materials.get(id.0) {
                None => return Err(SceneError::UnknownMaterial(*id)),
                Some(m) if m.ownership != Ownership::Shared => return Err(SceneError::NotShared),
                Some(_) => {}
            }
        }

        let node = self.spawn(parent, name)?;
        let geometry = match geometry {
            Source::Share(id) => id,
            Source::Own(value) => GeometryId(self.geometries.insert(Owned {
                value,
                ownership: Ownership::Exclusive(node),
            })),
        };
        let material = match material {
            Source::Share(id) => id,
            Source::Own(value) => MaterialId(self.materials.insert(Owned {
                value,
                ownership: Ownership::Exclusive(node),
            })),
        };
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.mesh = Some(Mesh { geometry, material });
        }
        Ok(node)
    }

    pub fn add_shared_geometry(&mut self, geometry: Geometry) -> GeometryId {
        GeometryId(self.geometries.insert(Owned {
            value: geometry,
            ownership: Ownership::Shared,
        }))
    }

    pub fn add_shared_material(&mut self, material: Material) -> MaterialId {
        MaterialId(self.materials.insert(Owned {
            value: material,
            ownership: Ownership::Shared,
        }))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id.0).map(|g| &g.value)
    }

    pub fn geometry_ownership(&self, id: GeometryId) -> Option<Ownership> {
        self.geometries.get(id.0).map(|g| g.ownership)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0).map(|m| &m.value)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0).map(|m| &mut m.value)
    }

    pub fn material_ownership(&self, id: MaterialId) -> Option<Ownership> {
        self.materials.get(id.0).map(|m| m.ownership)
    }

    /// Material of a mesh node.
    pub fn node_material_mut(&mut self, id: NodeId) -> Option<&mut Material> {
        let mesh = self.nodes.get(id.0)?.mesh?;
        self.material_mut(mesh.material)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id.0).ok_or(SceneError::UnknownNode(id))?;
        node.visible = visible;
        Ok(())
    }

    /// A node is drawn only if it and every ancestor are visible.
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.nodes.get(current.0) {
                Some(node) if node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id.0)?;
        let local = node.transform.matrix();
        match node.parent {
            Some(parent) => Some(self.world_matrix(parent)? * local),
            None => Some(local),
        }
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        Some(self.world_matrix(id)?.transform_point(Vec3::ZERO))
    }

    /// Drawable nodes in depth-first order (roots and children by creation
    /// order), skipping hidden subtrees.
    pub fn visible_meshes(&self) -> Vec<VisibleMesh> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|id| (*id, Mat4::IDENTITY))
            .collect();

        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = parent_world * node.transform.matrix();
            if let Some(mesh) = node.mesh {
                out.push(VisibleMesh {
                    node: id,
                    world,
                    mesh,
                    render_order: node.render_order,
                });
            }
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
        out
    }

    /// Removes `id` and all of its descendants, releasing every geometry and
    /// material exclusively owned by a removed node. Shared resources stay.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<DisposalReport, SceneError> {
        let parent = self.nodes.get(id.0).ok_or(SceneError::UnknownNode(id))?.parent;
        match parent.and_then(|p| self.nodes.get_mut(p.0)) {
            Some(p) => p.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }

        let mut report = DisposalReport::default();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.remove(current.0) else {
                continue;
            };
            report.nodes += 1;
            self.released.push(Released::Node(current));
            stack.extend(node.children.iter().copied());

            let Some(mesh) = node.mesh else {
                continue;
            };
            let owns_geometry = self
                .geometry_ownership(mesh.geometry)
                .is_some_and(|o| o == Ownership::Exclusive(current));
            if owns_geometry && self.geometries.remove(mesh.geometry.0).is_some() {
                report.geometries += 1;
                self.released.push(Released::Geometry(mesh.geometry));
            }
            let owns_material = self
                .material_ownership(mesh.material)
                .is_some_and(|o| o == Ownership::Exclusive(current));
            if owns_material && self.materials.remove(mesh.material.0).is_some() {
                report.materials += 1;
                self.released.push(Released::Material(mesh.material));
            }
        }
        debug!(
            nodes = report.nodes,
            geometries = report.geometries,
            materials = report.materials,
            "scene.remove_subtree"
        );
        Ok(report)
    }

    /// Releases shared resources no live node references any more.
    pub fn release_unused_shared(&mut self) -> DisposalReport {
        let mut used_geometries = Vec::new();
        let mut used_materials = Vec::new();
        for (_, node) in self.nodes.iter() {
            if let Some(mesh) = node.mesh {
                used_geometries.push(mesh.geometry);
                used_materials.push(mesh.material);
            }
        }

        let mut report = DisposalReport::default();
        let unused_geometries: Vec<GeometryId> = self
            .geometries
            .iter()
            .filter(|(_, g)| g.ownership == Ownership::Shared)
            .map(|(h, _)| GeometryId(h))
            .filter(|id| !used_geometries.contains(id))
            .collect();
        for id in unused_geometries {
            if self.geometries.remove(id.0).is_some() {
                report.geometries += 1;
                self.released.push(Released::Geometry(id));
            }
        }

        let unused_materials: Vec<MaterialId> = self
            .materials
            .iter()
            .filter(|(_, m)| m.ownership == Ownership::Shared)
            .map(|(h, _)| MaterialId(h))
            .filter(|id| !used_materials.contains(id))
            .collect();
        for id in unused_materials {
            if self.materials.remove(id.0).is_some() {
                report.materials += 1;
                self.released.push(Released::Material(id));
            }
        }
        report
    }

    /// Releases everything. A second call releases nothing.
    pub fn dispose_all(&mut self) -> DisposalReport {
        self.roots.clear();
        let nodes = self.nodes.drain();
        let geometries = self.geometries.drain();
        let materials = self.materials.drain();

        let report = DisposalReport {
            nodes: nodes.len(),
            geometries: geometries.len(),
            materials: materials.len(),
        };
        self.released
            .extend(nodes.into_iter().map(|(h, _)| Released::Node(NodeId(h))));
        self.released.extend(
            geometries
                .into_iter()
                .map(|(h, _)| Released::Geometry(GeometryId(h))),
        );
        self.released.extend(
            materials
                .into_iter()
                .map(|(h, _)| Released::Material(MaterialId(h))),
        );
        report
    }

    /// Everything released since the last drain, in release order.
    pub fn drain_released(&mut self) -> Vec<Released> {
        std::mem::take(&mut self.released)
    }
}
