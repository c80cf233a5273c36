pub mod cases;
pub mod geojson;
pub mod outline;
pub mod topology;

pub use cases::*;
pub use outline::*;
