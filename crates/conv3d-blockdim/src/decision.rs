//! Entry point: one block-dimension decision per convolution.

use crate::context::{BlockDimRequest, DecisionContext};
use crate::cost::CostModel;
use crate::error::Result;
use crate::feasibility::select_mode;
use crate::partition::{Partition, PartitionResult, SpatialSplit, SplitMode};
use crate::range::BlockDimRange;
use crate::saturation::saturate_height;
use crate::search::search;
use conv3d_common::{
    AttributeDescriptor, OperandDescriptor, PlatformInfo, ShapeDescriptor, TileGranularity,
    ceil_div,
};
use serde::Serialize;
use tracing::info;

/// The slice of the convolution one core computes.
///
/// Channel and spatial extents are rounded up to whole fractals, as the
/// micro-tiling stage consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoreWorkload {
    pub batch: u64,
    pub group: u64,
    pub cout: u64,
    pub dout: u64,
    /// `m` output positions (M-split) or an `ho x wo` window (HW-split).
    pub spatial: SpatialSplit,
}

impl CoreWorkload {
    fn new(ctx: &DecisionContext<'_>, partition: &Partition) -> Self {
        let TileGranularity { m0, n0, .. } = ctx.granularity;
        let spatial = match partition.spatial {
            SpatialSplit::Fused { m } => {
                SpatialSplit::Fused { m: ceil_div(ctx.m1, m).saturating_mul(m0) }
            }
            SpatialSplit::Separate { ho, wo } => SpatialSplit::Separate {
                ho: ceil_div(ctx.shape.hout, ho),
                wo: ceil_div(ctx.shape.wout, wo),
            },
        };
        Self {
            batch: ceil_div(ctx.shape.batch, partition.batch),
            group: ceil_div(ctx.grouping.groups(), partition.group),
            cout: ceil_div(ctx.co1, partition.cout).saturating_mul(n0),
            dout: ceil_div(ctx.shape.dout, partition.dout),
            spatial,
        }
    }
}

/// Outcome of [`decide_block_dim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockDimDecision {
    pub mode: SplitMode,
    pub result: PartitionResult,
    pub core_workload: CoreWorkload,
    pub core_count: u64,
    /// The height factor was raised past the search result to fill idle cores.
    pub saturated: bool,
}

impl BlockDimDecision {
    /// Cores the partition occupies.
    #[must_use]
    pub fn used_cores(&self) -> u64 {
        self.result.partition.used_cores()
    }

    /// One-line summary for logs.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "mode={} {} cores={}/{} cost={}{}",
            self.mode,
            self.result.partition,
            self.used_cores(),
            self.core_count,
            self.result.min_cost,
            if self.saturated { " saturated" } else { "" }
        )
    }
}

/// Decide the split mode and per-axis partition factors for one convolution.
///
/// # Errors
///
/// Invalid shapes or platforms, and shapes neither split mode can tile.
pub fn decide_block_dim(request: &BlockDimRequest<'_>) -> Result<BlockDimDecision> {
    let ctx = DecisionContext::new(request)?;
    let mode = select_mode(&ctx)?;
    let range = BlockDimRange::build(&ctx, mode);
    let cores = ctx.core_count();

    let model = CostModel::new(&ctx);
    let mut result = search(&model, &range, mode, cores);
    let saturated = mode == SplitMode::HwSplit
        && saturate_height(&mut result.partition, &range.spare_ho, cores);

    let decision = BlockDimDecision {
        mode,
        core_workload: CoreWorkload::new(&ctx, &result.partition),
        result,
        core_count: cores,
        saturated,
    };
    info!(
        mode = %decision.mode,
        grouping = ?ctx.grouping(),
        cores_used = decision.used_cores(),
        cost = decision.result.min_cost,
        "{}",
        decision.summary()
    );
    Ok(decision)
}

/// [`decide_block_dim`] with the platform taken from a provider.
pub fn decide_on<P: PlatformInfo + ?Sized>(
    shape: &ShapeDescriptor,
    attrs: &AttributeDescriptor,
    operands: &OperandDescriptor,
    provider: &P,
) -> Result<BlockDimDecision> {
    let platform = provider.platform();
    decide_block_dim(&BlockDimRequest::new(shape, attrs, operands, &platform))
}
