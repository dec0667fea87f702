//! Mode feasibility: does the smallest tile of a mode fit L1, and does the
//! shape stay inside the addressing limits of that mode's instructions?

use crate::context::DecisionContext;
use crate::error::{BlockDimError, Result};
use crate::partition::SplitMode;
use conv3d_common::TileGranularity;
use thiserror::Error;
use tracing::{debug, warn};

/// Widest input row a single 3-D load instruction can address.
pub const LOAD3D_MAX_WI: u64 = 32_767;
/// Channel-major feature-map offsets are 40-bit.
pub const MAX_40_BIT_NUM: u64 = (1 << 40) - 1;
/// Channel-last output store strides are 32-bit.
pub const MAX_32_BIT_NUM: u64 = u32::MAX as u64;

/// Why a split mode cannot be used for a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModeRejection {
    #[error("minimal L1 footprint {required} B exceeds L1 capacity {available} B")]
    L1Capacity { required: u64, available: u64 },
    #[error("input width {win} exceeds load3d limit {limit}")]
    Load3dWidth { win: u64, limit: u64 },
    #[error("channel-major fmap extent {extent} exceeds 40-bit addressing limit {limit}")]
    ChannelMajorAddressing { extent: u64, limit: u64 },
    #[error("channel-last output extent {extent} exceeds 32-bit store limit {limit}")]
    OutputStoreAddressing { extent: u64, limit: u64 },
}

/// L1 bytes held by one minimal tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L1Footprint {
    pub fmap: u64,
    pub weight: u64,
    pub bias: u64,
}

impl L1Footprint {
    fn new(ctx: &DecisionContext<'_>, fmap_rows: u64, fmap_cols: u64) -> Self {
        let TileGranularity { k0, n0, .. } = ctx.granularity;
        let operands = ctx.operands;
        let fmap = fmap_rows
            .saturating_mul(fmap_cols)
            .saturating_mul(k0)
            .saturating_mul(operands.fmap_dtype.byte_size());
        let weight = k0
            .saturating_mul(ctx.shape.kh)
            .saturating_mul(ctx.shape.kw)
            .saturating_mul(n0)
            .saturating_mul(operands.weight_dtype.byte_size());
        let bias =
            if ctx.attrs.has_bias { n0 * operands.bias_dtype_or_output().byte_size() } else { 0 };
        Self { fmap, weight, bias }
    }

    /// Smallest M-split tile: one `m0` block of output positions, which may
    /// straddle a row boundary, over full padded input rows.
    #[must_use]
    pub fn m_split(ctx: &DecisionContext<'_>) -> Self {
        let rows = ctx.rows_spanned(ctx.granularity.m0);
        Self::new(ctx, ctx.input_rows(rows), ctx.win_padded)
    }

    /// Smallest HW-split tile: one output row, at most `m0` output columns.
    #[must_use]
    pub fn hw_split(ctx: &DecisionContext<'_>) -> Self {
        let wo = ctx.shape.wout.min(ctx.granularity.m0);
        Self::new(ctx, ctx.input_rows(1), ctx.input_cols(wo))
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.fmap.saturating_add(self.weight).saturating_add(self.bias)
    }

    fn check(&self, l1_size: u64) -> std::result::Result<(), ModeRejection> {
        let required = self.total();
        if required > l1_size {
            return Err(ModeRejection::L1Capacity { required, available: l1_size });
        }
        Ok(())
    }
}

/// Check M-split: L1 capacity, then the load3d width, then 40-bit
/// addressing for channel-major feature maps.
pub fn check_m_split(ctx: &DecisionContext<'_>) -> std::result::Result<(), ModeRejection> {
    L1Footprint::m_split(ctx).check(ctx.platform.l1_size)?;

    let win = ctx.shape.win;
    if win > LOAD3D_MAX_WI {
        return Err(ModeRejection::Load3dWidth { win, limit: LOAD3D_MAX_WI });
    }

    if ctx.operands.fmap_format.is_channel_major() {
        let extent = ctx
            .shape
            .cin
            .saturating_mul(ctx.shape.hin)
            .saturating_mul(win)
            .saturating_mul(ctx.attrs.dilation.d);
        if extent > MAX_40_BIT_NUM {
            return Err(ModeRejection::ChannelMajorAddressing { extent, limit: MAX_40_BIT_NUM });
        }
    }
    Ok(())
}

/// Check HW-split: L1 capacity, then 32-bit output store strides for
/// channel-last feature maps.
pub fn check_hw_split(ctx: &DecisionContext<'_>) -> std::result::Result<(), ModeRejection> {
    L1Footprint::hw_split(ctx).check(ctx.platform.l1_size)?;

    if ctx.operands.fmap_format.is_channel_last() {
        let extent = ctx.shape.wout.saturating_mul(ctx.shape.cout);
        if extent > MAX_32_BIT_NUM {
            return Err(ModeRejection::OutputStoreAddressing { extent, limit: MAX_32_BIT_NUM });
        }
    }
    Ok(())
}

/// M-split when feasible, otherwise HW-split, otherwise
/// [`BlockDimError::NoFeasibleMode`].
pub fn select_mode(ctx: &DecisionContext<'_>) -> Result<SplitMode> {
    let m_split = match check_m_split(ctx) {
        Ok(()) => {
            debug!(mode = %SplitMode::MSplit, "split mode selected");
            return Ok(SplitMode::MSplit);
        }
        Err(reason) => reason,
    };
    debug!(mode = %SplitMode::MSplit, reason = %m_split, "split mode rejected");

    match check_hw_split(ctx) {
        Ok(()) => {
            debug!(mode = %SplitMode::HwSplit, "split mode selected");
            Ok(SplitMode::HwSplit)
        }
        Err(hw_split) => {
            warn!(%m_split, %hw_split, "no feasible split mode");
            Err(BlockDimError::NoFeasibleMode { m_split, hw_split })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{Fixture, dense, regression};
    use conv3d_common::{
        AttributeDescriptor, DataType, FeatureMapFormat, OperandDescriptor, PlatformPreset,
        ShapeDescriptor, Spatial3, WeightFormat,
    };

    fn build(
        dtype: DataType,
        fmap_format: FeatureMapFormat,
        (batch, cin, cout): (u64, u64, u64),
        input: Spatial3,
        kernel: Spatial3,
        attrs: AttributeDescriptor,
    ) -> Fixture {
        let shape = ShapeDescriptor::infer(batch, cin, input, cout, kernel, &attrs);
        Fixture {
            shape,
            attrs,
            operands: OperandDescriptor::uniform(dtype, fmap_format, WeightFormat::Ncdhw),
            platform: PlatformPreset::Ascend910B.descriptor(),
        }
    }

    #[test]
    fn regression_shape_fits_m_split() {
        let fixture = regression();
        let ctx = fixture.context();
        let footprint = L1Footprint::m_split(&ctx);
        assert_eq!(footprint, L1Footprint { fmap: 3072, weight: 2048, bias: 0 });
        assert_eq!(select_mode(&ctx).unwrap(), SplitMode::MSplit);
    }

    #[test]
    fn bias_adds_one_fractal_row() {
        let mut fixture = dense(1, 16, 8, 16);
        fixture.attrs.has_bias = true;
        let ctx = fixture.context();
        assert_eq!(L1Footprint::m_split(&ctx).bias, 32);
        assert_eq!(L1Footprint::hw_split(&ctx).bias, 32);
    }

    #[test]
    fn hw_split_window_is_one_output_row() {
        let fixture = dense(1, 16, 32, 16);
        let ctx = fixture.context();
        // one row of the 3x3 kernel reads 3 padded input rows and 18 columns.
        let footprint = L1Footprint::hw_split(&ctx);
        assert_eq!(footprint.fmap, 3 * 18 * 16 * 2);
        assert_eq!(footprint.weight, 16 * 3 * 3 * 16 * 2);
    }

    #[test]
    fn wide_input_rejects_m_split() {
        let mut fixture = build(
            DataType::Float16,
            FeatureMapFormat::Ndc1hwc0,
            (1, 16, 16),
            Spatial3::new(1, 1, 40_000),
            Spatial3::splat(1),
            AttributeDescriptor::default(),
        );
        fixture.platform.l1_size = 16 * 1024 * 1024;
        let ctx = fixture.context();
        let rejection = ModeRejection::Load3dWidth { win: 40_000, limit: LOAD3D_MAX_WI };
        assert_eq!(check_m_split(&ctx), Err(rejection));
        assert_eq!(select_mode(&ctx).unwrap(), SplitMode::HwSplit);
    }

    #[test]
    fn channel_major_addressing_rejects_m_split() {
        let dilation = Spatial3::new(1025, 1, 1);
        let attrs = AttributeDescriptor { dilation, ..Default::default() };
        let mut fixture = build(
            DataType::Float16,
            FeatureMapFormat::Ncdhw,
            (1, 4096, 16),
            Spatial3::new(1, 16_384, 16),
            Spatial3::splat(1),
            attrs,
        );
        {
            let ctx = fixture.context();
            assert!(L1Footprint::m_split(&ctx).total() <= ctx.platform.l1_size);
            let Err(ModeRejection::ChannelMajorAddressing { extent, limit }) = check_m_split(&ctx)
            else {
                panic!("expected a 40-bit addressing rejection");
            };
            assert_eq!(extent, 4096 * 16_384 * 16 * 1025);
            assert_eq!(limit, MAX_40_BIT_NUM);
        }

        // the same extents in the fractal layout are addressable.
        fixture.operands.fmap_format = FeatureMapFormat::Ndc1hwc0;
        let ctx = fixture.context();
        assert_eq!(check_m_split(&ctx), Ok(()));
    }

    #[test]
    fn l1_capacity_is_checked_first() {
        let mut fixture = regression();
        fixture.platform.l1_size = 4096;
        let ctx = fixture.context();
        let rejection = ModeRejection::L1Capacity { required: 5120, available: 4096 };
        assert_eq!(check_m_split(&ctx), Err(rejection));
    }

    #[test]
    fn no_feasible_mode_carries_both_reasons() {
        let fixture = build(
            DataType::Float16,
            FeatureMapFormat::Ndhwc,
            (1, 16, 65_536),
            Spatial3::new(1, 1, 70_000),
            Spatial3::splat(1),
            AttributeDescriptor::default(),
        );
        let ctx = fixture.context();
        let err = select_mode(&ctx).unwrap_err();
        assert!(err.is_infeasible());
        let BlockDimError::NoFeasibleMode { m_split, hw_split } = err else {
            panic!("expected NoFeasibleMode");
        };
        assert!(matches!(m_split, ModeRejection::L1Capacity { .. }));
        assert_eq!(
            hw_split,
            ModeRejection::OutputStoreAddressing { extent: 70_000 * 65_536, limit: MAX_32_BIT_NUM }
        );
    }
}
