//! Pixel-space bounding box and size types.

mod common;

pub use pixel_box::*;
pub mod pixel_box;

pub use hw::*;
pub mod hw;
