pub mod aggregate;
pub mod client;
pub mod estimate;
pub mod normalize;
pub mod orchestrator;

pub use aggregate::*;
pub use client::*;
pub use estimate::*;
pub use normalize::*;
pub use orchestrator::*;
