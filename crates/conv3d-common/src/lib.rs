//! Common types for conv3d tiling.
//!
//! This crate provides the descriptors handed to the tiling stages: element
//! types and their hardware tile granularity, tensor layouts, convolution
//! shape and attribute descriptors, and the accelerator platform description
//! with its configuration loading.

pub mod dtype;
pub mod format;
pub mod math;
pub mod platform;
pub mod shape;

pub use dtype::{DataType, TileGranularity};
pub use format::{FeatureMapFormat, WeightFormat};
pub use math::{align_up, ceil_div, floor_div};
pub use platform::{PlatformDescriptor, PlatformError, PlatformInfo, PlatformPreset};
pub use shape::{
    AttributeDescriptor, OperandDescriptor, Padding3, ShapeDescriptor, ShapeError, Spatial3,
    output_extent,
};
