//! Multi-core block-dimension decision for 3-D convolution tiling.
//!
//! Given one convolution and the accelerator it runs on, decide how the
//! work is spread over the compute cores:
//!
//! 1. [`select_mode`] picks M-split (output height and width fused) when its
//!    minimal tile fits L1 and the shape stays inside its addressing limits,
//!    and falls back to HW-split otherwise.
//! 2. [`BlockDimRange::build`] enumerates candidate factors per axis from
//!    the axis divisors crossed with the core-count divisors.
//! 3. [`search`] walks every combination whose factors fit the core count and
//!    keeps the cheapest under [`CostModel`].
//! 4. For HW-split, [`saturate_height`] raises the height factor into cores
//!    the search left idle.
//!
//! [`decide_block_dim`] runs all four steps.
//!
//! ```
//! use conv3d_blockdim::{BlockDimRequest, SplitMode, decide_block_dim};
//! use conv3d_common::{
//!     AttributeDescriptor, DataType, FeatureMapFormat, OperandDescriptor, PlatformPreset,
//!     ShapeDescriptor, Spatial3, WeightFormat,
//! };
//!
//! let attrs = AttributeDescriptor { stride: Spatial3::new(1, 2, 2), ..Default::default() };
//! let (input, kernel) = (Spatial3::new(120, 16, 16), Spatial3::new(1, 2, 2));
//! let shape = ShapeDescriptor::infer(1, 4, input, 1152, kernel, &attrs);
//! let operands =
//!     OperandDescriptor::uniform(DataType::Float32, FeatureMapFormat::Ncdhw, WeightFormat::Ncdhw);
//! let platform = PlatformPreset::Ascend910B.descriptor();
//!
//! let request = BlockDimRequest::new(&shape, &attrs, &operands, &platform);
//! let decision = decide_block_dim(&request).unwrap();
//! assert_eq!(decision.mode, SplitMode::MSplit);
//! assert!(decision.used_cores() <= platform.core_count);
//! ```

pub mod context;
pub mod cost;
pub mod decision;
pub mod divisors;
pub mod error;
pub mod feasibility;
pub mod grouping;
pub mod partition;
pub mod range;
pub mod saturation;
pub mod search;

pub use context::{BlockDimRequest, DecisionContext};
pub use cost::{CostBreakdown, CostModel, WeightBandwidth};
pub use decision::{BlockDimDecision, CoreWorkload, decide_block_dim, decide_on};
pub use divisors::{divisors_up_to, mix_with_reference};
pub use error::{BlockDimError, Result};
pub use feasibility::{
    L1Footprint, LOAD3D_MAX_WI, MAX_32_BIT_NUM, MAX_40_BIT_NUM, ModeRejection, check_hw_split,
    check_m_split, select_mode,
};
pub use grouping::GroupingVariant;
pub use partition::{Axis, Partition, PartitionResult, SpatialSplit, SplitMode};
pub use range::BlockDimRange;
pub use saturation::saturate_height;
pub use search::search;
