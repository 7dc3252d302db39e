pub mod discovery;
pub mod preprocessing;
pub mod extraction;
pub mod simplification;
pub mod aggregation;

pub use discovery::*;
pub use preprocessing::*;
pub use extraction::*;
pub use simplification::*;
pub use aggregation::*;
