//! Per-image processing: geometry transforms and sample assembly.

mod geometry;
mod sample;

pub use geometry::*;
pub use sample::*;
