use foundation::handles::Handle;

/// A node in the [`SceneGraph`](crate::SceneGraph).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub Handle);

/// A geometry resource stored in the scene graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeometryId(pub Handle);

/// A material resource stored in the scene graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub Handle);

impl NodeId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}

impl GeometryId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}

impl MaterialId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}
