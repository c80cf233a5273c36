pub mod arena;
pub mod handles;
pub mod math;
pub mod time;

// Small, well-tested primitives shared by every crate.
pub use arena::*;
pub use handles::*;
pub use time::*;
