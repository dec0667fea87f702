//! Candidate partition factors per axis.

use crate::context::DecisionContext;
use crate::divisors::{divisors_up_to, mix_with_reference};
use crate::partition::{Axis, SplitMode};
use conv3d_common::{ceil_div, floor_div};
use tracing::trace;

/// Ascending candidate factors for every axis of one decision.
///
/// Axes the mode does not partition hold `[1]`. `spare_ho` collects height
/// factors that would shrink output rows below one store burst; the search
/// never sees them, the saturation step may.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDimRange {
    pub batch: Vec<u64>,
    pub m: Vec<u64>,
    pub ho: Vec<u64>,
    pub wo: Vec<u64>,
    pub cout: Vec<u64>,
    pub dout: Vec<u64>,
    pub group: Vec<u64>,
    pub spare_ho: Vec<u64>,
}

/// Divisors of `dim` up to the core count, widened with the core-count
/// divisors that do not exceed `dim`.
fn mixed_divisors(dim: u64, cores: u64, core_range: &[u64]) -> Vec<u64> {
    let mut range = divisors_up_to(dim, cores);
    mix_with_reference(dim, &mut range, core_range);
    range
}

impl BlockDimRange {
    pub fn build(ctx: &DecisionContext<'_>, mode: SplitMode) -> Self {
        let shape = ctx.shape;
        let cores = ctx.core_count();
        let core_range = divisors_up_to(cores, cores);
        let axis = |dim: u64| mixed_divisors(dim, cores, &core_range);

        let batch = if shape.batch >= cores.saturating_mul(2) {
            core_range.clone()
        } else {
            axis(shape.batch)
        };
        let dout = if ctx.operands.fmap_format.has_depth() { axis(shape.dout) } else { vec![1] };

        let mut range = Self {
            batch,
            m: vec![1],
            ho: vec![1],
            wo: vec![1],
            cout: axis(ctx.co1),
            dout,
            group: axis(ctx.grouping.groups()),
            spare_ho: Vec::new(),
        };

        match mode {
            SplitMode::MSplit => range.m = axis(ctx.m1),
            SplitMode::HwSplit => {
                let (ho, spare_ho) = split_for_min_burst(ctx, axis(shape.hout));
                range.ho = ho;
                range.spare_ho = spare_ho;
                if ctx.conv1d_over_width() {
                    range.wo = axis(shape.wout);
                }
            }
        }
        trace!(%mode, ?range, "candidate ranges built");
        range
    }

    /// Candidates for `axis`.
    #[must_use]
    pub fn candidates(&self, axis: Axis) -> &[u64] {
        match axis {
            Axis::Batch => &self.batch,
            Axis::M => &self.m,
            Axis::Ho => &self.ho,
            Axis::Wo => &self.wo,
            Axis::Cout => &self.cout,
            Axis::Dout => &self.dout,
            Axis::Group => &self.group,
        }
    }

    /// Number of terminal partitions before pruning.
    #[must_use]
    pub fn search_space(&self, mode: SplitMode) -> u64 {
        mode.axes()
            .iter()
            .fold(1u64, |acc, &axis| acc.saturating_mul(self.candidates(axis).len() as u64))
    }
}

/// Split height candidates by whether each core still stores at least one
/// full burst per output row block. Factor 1 always stays.
fn split_for_min_burst(ctx: &DecisionContext<'_>, candidates: Vec<u64>) -> (Vec<u64>, Vec<u64>) {
    let burst = floor_div(ctx.platform.l2_rate, ctx.operands.output_dtype.byte_size());
    let wout = ctx.shape.wout;
    if wout >= burst {
        return (candidates, Vec::new());
    }
    let min_rows = ceil_div(burst, wout);
    let hout = ctx.shape.hout;
    candidates.into_iter().partition(|&f| f == 1 || ceil_div(hout, f) >= min_rows)
}
