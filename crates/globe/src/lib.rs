//! Headless globe engine: scene construction, intro timeline, camera control,
//! marker hit-testing, overlay projection and lifecycle. The browser crate
//! feeds it timestamps and input and draws what it returns.

pub mod activation;
pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod intro;
pub mod markers;
pub mod outline_loader;
pub mod overlay;
pub mod selection;

pub use activation::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use markers::*;
pub use outline_loader::*;
pub use selection::*;
