pub mod components;
pub mod entity;
pub mod fade;
pub mod graph;
pub mod picking;
pub mod prefabs;

pub use entity::*;
pub use fade::Fade;
pub use graph::*;
