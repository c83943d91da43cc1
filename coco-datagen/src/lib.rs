//! COCO-format dataset adapter producing fixed-shape training batches.

mod common;
pub mod config;
pub mod dataset;
pub mod generator;
pub mod processor;
