//! YouTube success math utilities.

pub mod stats;
pub mod transform;

pub use stats::*;
pub use transform::*;
