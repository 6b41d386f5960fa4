//! Strategy engine: rule-based edge scoring and edge selection.

pub mod edge;
pub mod scoring;

pub use edge::{EdgeConfig, EdgeDetector};
pub use scoring::score;
