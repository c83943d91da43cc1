//! COCO segmentation decoding primitives.
//!
//! All masks produced here use the COCO column-major (Fortran) pixel order:
//! pixel (x, y) of an h-by-w mask lives at index `y + h * x`.

pub use poly::*;
pub mod poly;

pub use rle::*;
pub mod rle;
