//! Decision inputs and the values derived from them once per decision.

use crate::error::Result;
use crate::grouping::GroupingVariant;
use conv3d_common::{
    AttributeDescriptor, OperandDescriptor, PlatformDescriptor, ShapeDescriptor, TileGranularity,
    ceil_div,
};

/// Everything one block-dimension decision reads. Borrowed, never mutated.
#[derive(Debug, Clone, Copy)]
pub struct BlockDimRequest<'a> {
    pub shape: &'a ShapeDescriptor,
    pub attrs: &'a AttributeDescriptor,
    pub operands: &'a OperandDescriptor,
    pub platform: &'a PlatformDescriptor,
}

impl<'a> BlockDimRequest<'a> {
    pub fn new(
        shape: &'a ShapeDescriptor,
        attrs: &'a AttributeDescriptor,
        operands: &'a OperandDescriptor,
        platform: &'a PlatformDescriptor,
    ) -> Self {
        Self { shape, attrs, operands, platform }
    }
}

/// Quantities derived from a validated [`BlockDimRequest`].
///
/// Built at the start of a decision and dropped with it.
#[derive(Debug, Clone)]
pub struct DecisionContext<'a> {
    pub(crate) shape: &'a ShapeDescriptor,
    pub(crate) attrs: &'a AttributeDescriptor,
    pub(crate) operands: &'a OperandDescriptor,
    pub(crate) platform: &'a PlatformDescriptor,
    pub(crate) granularity: TileGranularity,
    pub(crate) grouping: GroupingVariant,
    /// Input channels of one group in `k0` fractals.
    pub(crate) ci1: u64,
    /// Output channels of one group in `n0` fractals.
    pub(crate) co1: u64,
    /// Output positions of one `(d, n, c)` slice in `m0` fractals.
    pub(crate) m1: u64,
    pub(crate) hin_padded: u64,
    pub(crate) win_padded: u64,
    pub(crate) dilated_kh: u64,
    pub(crate) dilated_kw: u64,
}

impl<'a> DecisionContext<'a> {
    /// Validate the request and derive the per-decision constants.
    pub fn new(request: &BlockDimRequest<'a>) -> Result<Self> {
        let BlockDimRequest { shape, attrs, operands, platform } = *request;
        shape.validate(attrs)?;
        platform.validate()?;

        let granularity = operands.fmap_dtype.granularity();
        let grouping = GroupingVariant::resolve(shape, attrs.groups, operands, granularity);
        let pad = attrs.pad;
        Ok(Self {
            shape,
            attrs,
            operands,
            platform,
            granularity,
            grouping,
            ci1: ceil_div(grouping.cin(), granularity.k0),
            co1: ceil_div(grouping.cout(), granularity.n0),
            m1: ceil_div(shape.hout.saturating_mul(shape.wout), granularity.m0),
            hin_padded: shape.hin.saturating_add(pad.top).saturating_add(pad.bottom),
            win_padded: shape.win.saturating_add(pad.left).saturating_add(pad.right),
            dilated_kh: AttributeDescriptor::dilated(shape.kh, attrs.dilation.h),
            dilated_kw: AttributeDescriptor::dilated(shape.kw, attrs.dilation.w),
        })
    }

    pub fn granularity(&self) -> TileGranularity {
        self.granularity
    }

    pub fn grouping(&self) -> GroupingVariant {
        self.grouping
    }

    pub fn core_count(&self) -> u64 {
        self.platform.core_count
    }

    /// `(ci1, co1)`: per-group channel counts in fractals.
    pub fn channel_fractals(&self) -> (u64, u64) {
        (self.ci1, self.co1)
    }

    /// Width-only convolutions partition the output width as well.
    pub fn conv1d_over_width(&self) -> bool {
        self.shape.is_conv1d_over_width()
    }

    /// Input rows touched by `rows` consecutive output rows, clamped to the
    /// padded input height.
    pub(crate) fn input_rows(&self, rows: u64) -> u64 {
        let strided = rows.saturating_sub(1).saturating_mul(self.attrs.stride.h);
        strided.saturating_add(self.dilated_kh).min(self.hin_padded)
    }

    /// Input columns touched by `cols` consecutive output columns.
    pub(crate) fn input_cols(&self, cols: u64) -> u64 {
        let strided = cols.saturating_sub(1).saturating_mul(self.attrs.stride.w);
        strided.saturating_add(self.dilated_kw).min(self.win_padded)
    }

    /// Output rows covered by a run of `positions` flattened output positions
    /// starting anywhere inside a row.
    pub(crate) fn rows_spanned(&self, positions: u64) -> u64 {
        ceil_div(positions, self.shape.wout).saturating_add(1).min(self.shape.hout)
    }
}
