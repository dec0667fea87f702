//! Analytic cost of a candidate partition.
//!
//! The cost of a partition is the data one core moves (feature map, weights,
//! output), normalized by the slowest inter-tier bandwidth, plus the number of
//! cube fractal operations it issues. Every per-core extent is a ceiling
//! division of the full workload by the partition factor.

use crate::context::DecisionContext;
use crate::partition::{Partition, SpatialSplit};
use conv3d_common::{TileGranularity, align_up, ceil_div};
use serde::Serialize;

/// Scales the weight load term by how well the weight layout streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightBandwidth {
    /// Weights already in the fractal layout the cube unit consumes: halved.
    NativeWeight,
    /// Channel-major feature map without group merging: doubled.
    ChannelMajor,
    Neutral,
}

impl WeightBandwidth {
    fn for_context(ctx: &DecisionContext<'_>) -> Self {
        if ctx.operands.weight_format.is_native() {
            Self::NativeWeight
        } else if ctx.operands.fmap_format.is_channel_major() && !ctx.grouping.is_optimized() {
            Self::ChannelMajor
        } else {
            Self::Neutral
        }
    }

    /// Coefficient as `(numerator, denominator)`.
    #[must_use]
    pub const fn ratio(self) -> (u128, u128) {
        match self {
            Self::NativeWeight => (1, 2),
            Self::ChannelMajor => (2, 1),
            Self::Neutral => (1, 1),
        }
    }
}

/// The terms that make up one cost evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostBreakdown {
    pub load_fmap: u128,
    /// Weight load before the bandwidth coefficient.
    pub load_weight: u128,
    pub load_output: u128,
    pub cube: u128,
    pub bandwidth: WeightBandwidth,
    pub total: u64,
}

/// Per-core spatial workload.
struct SpatialWork {
    /// Feature-map positions loaded, rounded up to `m0`.
    fmap: u64,
    /// Output positions stored, rounded up to `m0`.
    output: u64,
    /// Output positions in `m0` fractals.
    cube_m: u64,
}

fn product(terms: &[u64]) -> u128 {
    terms.iter().fold(1u128, |acc, &t| acc.saturating_mul(u128::from(t)))
}

/// Evaluates partitions of one decision.
#[derive(Debug, Clone, Copy)]
pub struct CostModel<'c> {
    ctx: &'c DecisionContext<'c>,
    bandwidth: WeightBandwidth,
}

impl<'c> CostModel<'c> {
    pub fn new(ctx: &'c DecisionContext<'c>) -> Self {
        Self { ctx, bandwidth: WeightBandwidth::for_context(ctx) }
    }

    #[must_use]
    pub fn bandwidth(&self) -> WeightBandwidth {
        self.bandwidth
    }

    /// Total cost of `partition`.
    #[must_use]
    pub fn cost(&self, partition: &Partition) -> u64 {
        self.breakdown(partition).total
    }

    fn spatial(&self, split: SpatialSplit) -> SpatialWork {
        let ctx = self.ctx;
        let m0 = ctx.granularity.m0;
        match split {
            SpatialSplit::Fused { m } => {
                let cur_m1 = ceil_div(ctx.m1, m);
                let cur_m = cur_m1.saturating_mul(m0);
                let cur_hi = ctx.input_rows(ctx.rows_spanned(cur_m));
                let fmap = align_up(cur_hi.saturating_mul(ctx.win_padded), m0);
                SpatialWork { fmap, output: cur_m, cube_m: cur_m1 }
            }
            SpatialSplit::Separate { ho, wo } => {
                let cur_ho = ceil_div(ctx.shape.hout, ho);
                let cur_wo = ceil_div(ctx.shape.wout, wo);
                let cur_hi = ctx.input_rows(cur_ho);
                let cur_wi = ctx.input_cols(cur_wo);
                let out = cur_ho.saturating_mul(cur_wo);
                SpatialWork {
                    fmap: align_up(cur_hi.saturating_mul(cur_wi), m0),
                    output: align_up(out, m0),
                    cube_m: ceil_div(out, m0),
                }
            }
        }
    }

    /// Every term of the cost of `partition`.
    #[must_use]
    pub fn breakdown(&self, partition: &Partition) -> CostBreakdown {
        let ctx = self.ctx;
        let shape = ctx.shape;
        let TileGranularity { k0, n0, .. } = ctx.granularity;
        let (ci1, co1) = (ctx.ci1, ctx.co1);

        let batch = ceil_div(shape.batch, partition.batch);
        let group = ceil_div(ctx.grouping.groups(), partition.group);
        let dout = ceil_div(shape.dout, partition.dout);
        let cout = ceil_div(co1.saturating_mul(n0), partition.cout);
        let cout1 = ceil_div(co1, partition.cout);
        let work = self.spatial(partition.spatial);

        let load_fmap = product(&[batch, group, dout, work.fmap, shape.kd, ci1, k0]);
        let weight_per_cout = product(&[group, shape.kd, ci1, shape.kh, shape.kw, k0, batch]);
        let load_weight = if ctx.grouping.is_optimized() {
            weight_per_cout
        } else {
            weight_per_cout.saturating_mul(u128::from(cout))
        };
        let load_output = product(&[batch, group, cout, dout, work.output]);
        let cube =
            product(&[batch, group, cout1, dout, shape.kd, ci1, shape.kh, shape.kw, work.cube_m]);

        let (num, den) = self.bandwidth.ratio();
        let moved = load_fmap
            .saturating_add(load_weight.saturating_mul(num) / den)
            .saturating_add(load_output);
        let bandwidth = u128::from(ctx.platform.min_bandwidth().max(1));
        let total = (moved / bandwidth).saturating_add(cube);

        CostBreakdown {
            load_fmap,
            load_weight,
            load_output,
            cube,
            bandwidth: self.bandwidth,
            total: u64::try_from(total).unwrap_or(u64::MAX),
        }
    }
}
