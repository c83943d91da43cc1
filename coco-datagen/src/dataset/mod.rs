//! COCO annotation store and record schema.

mod record;
mod store;

pub use record::*;
pub use store::*;
