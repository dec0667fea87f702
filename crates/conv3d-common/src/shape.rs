//! Convolution shape, attribute and operand descriptors.

use crate::dtype::DataType;
use crate::format::{FeatureMapFormat, WeightFormat};
use crate::math::floor_div;
use serde::{Deserialize, Serialize};

/// A value per spatial axis (depth, height, width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spatial3 {
    pub d: u64,
    pub h: u64,
    pub w: u64,
}

impl Spatial3 {
    #[must_use]
    pub const fn new(d: u64, h: u64, w: u64) -> Self {
        Self { d, h, w }
    }

    #[must_use]
    pub const fn splat(v: u64) -> Self {
        Self { d: v, h: v, w: v }
    }
}

impl Default for Spatial3 {
    fn default() -> Self {
        Self::splat(1)
    }
}

/// Padding on both sides of every spatial axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Padding3 {
    pub head: u64,
    pub tail: u64,
    pub top: u64,
    pub bottom: u64,
    pub left: u64,
    pub right: u64,
}

impl Padding3 {
    #[must_use]
    pub const fn symmetric(d: u64, h: u64, w: u64) -> Self {
        Self { head: d, tail: d, top: h, bottom: h, left: w, right: w }
    }
}

/// Convolution attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub stride: Spatial3,
    pub dilation: Spatial3,
    pub pad: Padding3,
    pub groups: u64,
    pub has_bias: bool,
    /// Quantized (int8) convolution. Carried for the micro-tiling stage.
    pub quant: bool,
    /// Float32 inputs computed with HF32 cube instructions.
    pub hf32: bool,
}

impl Default for AttributeDescriptor {
    fn default() -> Self {
        Self {
            stride: Spatial3::splat(1),
            dilation: Spatial3::splat(1),
            pad: Padding3::default(),
            groups: 1,
            has_bias: false,
            quant: false,
            hf32: false,
        }
    }
}

impl AttributeDescriptor {
    /// Kernel extent after dilation: `(k - 1) * dilation + 1`.
    #[must_use]
    pub const fn dilated(k: u64, dilation: u64) -> u64 {
        k.saturating_sub(1).saturating_mul(dilation).saturating_add(1)
    }
}

/// Extents of one convolution: input, output and kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    pub batch: u64,
    pub cin: u64,
    pub din: u64,
    pub hin: u64,
    pub win: u64,
    pub cout: u64,
    pub dout: u64,
    pub hout: u64,
    pub wout: u64,
    pub kd: u64,
    pub kh: u64,
    pub kw: u64,
}

/// Output extent along one axis. Yields `0` for a zero stride or when the
/// dilated kernel does not fit the padded input.
#[must_use]
pub fn output_extent(
    input: u64,
    kernel: u64,
    stride: u64,
    dilation: u64,
    pad_before: u64,
    pad_after: u64,
) -> u64 {
    let padded = input.saturating_add(pad_before).saturating_add(pad_after);
    let dilated = AttributeDescriptor::dilated(kernel, dilation);
    if stride == 0 || padded < dilated {
        return 0;
    }
    floor_div(padded - dilated, stride) + 1
}

impl ShapeDescriptor {
    /// Build a descriptor, deriving the output extents from the attributes.
    #[must_use]
    pub fn infer(
        batch: u64,
        cin: u64,
        input: Spatial3,
        cout: u64,
        kernel: Spatial3,
        attrs: &AttributeDescriptor,
    ) -> Self {
        let (pad, stride, dilation) = (attrs.pad, attrs.stride, attrs.dilation);
        Self {
            batch,
            cin,
            din: input.d,
            hin: input.h,
            win: input.w,
            cout,
            dout: output_extent(input.d, kernel.d, stride.d, dilation.d, pad.head, pad.tail),
            hout: output_extent(input.h, kernel.h, stride.h, dilation.h, pad.top, pad.bottom),
            wout: output_extent(input.w, kernel.w, stride.w, dilation.w, pad.left, pad.right),
            kd: kernel.d,
            kh: kernel.h,
            kw: kernel.w,
        }
    }

    /// Reject extents the tiling search cannot reason about.
    pub fn validate(&self, attrs: &AttributeDescriptor) -> Result<(), ShapeError> {
        let extents = [
            ("batch", self.batch),
            ("cin", self.cin),
            ("din", self.din),
            ("hin", self.hin),
            ("win", self.win),
            ("cout", self.cout),
            ("dout", self.dout),
            ("hout", self.hout),
            ("wout", self.wout),
            ("kd", self.kd),
            ("kh", self.kh),
            ("kw", self.kw),
        ];
        if let Some(&(name, _)) = extents.iter().find(|(_, v)| *v == 0) {
            return Err(ShapeError::ZeroExtent { name });
        }
        if attrs.groups == 0 {
            return Err(ShapeError::ZeroGroups);
        }
        for (name, channels) in [("cin", self.cin), ("cout", self.cout)] {
            if !channels.is_multiple_of(attrs.groups) {
                let groups = attrs.groups;
                return Err(ShapeError::ChannelsNotDivisible { name, channels, groups });
            }
        }
        Ok(())
    }

    /// `din == hin == kd == kh == 1`: the convolution only slides along width.
    #[must_use]
    pub const fn is_conv1d_over_width(&self) -> bool {
        self.din == 1 && self.hin == 1 && self.kd == 1 && self.kh == 1
    }
}

/// Element types and layouts of the convolution operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperandDescriptor {
    pub fmap_dtype: DataType,
    pub weight_dtype: DataType,
    pub output_dtype: DataType,
    pub bias_dtype: Option<DataType>,
    pub fmap_format: FeatureMapFormat,
    pub weight_format: WeightFormat,
}

impl OperandDescriptor {
    /// Every operand in `dtype`, no bias, dense layouts.
    #[must_use]
    pub const fn uniform(
        dtype: DataType,
        fmap_format: FeatureMapFormat,
        weight_format: WeightFormat,
    ) -> Self {
        Self {
            fmap_dtype: dtype,
            weight_dtype: dtype,
            output_dtype: dtype,
            bias_dtype: None,
            fmap_format,
            weight_format,
        }
    }

    /// Bias element type, defaulting to the output type.
    #[must_use]
    pub fn bias_dtype_or_output(&self) -> DataType {
        self.bias_dtype.unwrap_or(self.output_dtype)
    }
}

/// Shape validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("shape extent `{name}` must be greater than zero")]
    ZeroExtent { name: &'static str },
    #[error("group count must be greater than zero")]
    ZeroGroups,
    #[error("`{name}` = {channels} is not divisible by groups = {groups}")]
    ChannelsNotDivisible { name: &'static str, channels: u64, groups: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regression_attrs() -> AttributeDescriptor {
        AttributeDescriptor { stride: Spatial3::new(1, 2, 2), ..AttributeDescriptor::default() }
    }

    #[test]
    fn infer_matches_known_regression_shape() {
        let attrs = regression_attrs();
        let input = Spatial3::new(120, 16, 16);
        let shape = ShapeDescriptor::infer(1, 4, input, 1152, Spatial3::new(1, 2, 2), &attrs);
        assert_eq!((shape.dout, shape.hout, shape.wout), (120, 8, 8));
        assert!(shape.validate(&attrs).is_ok());
    }

    #[test]
    fn output_extent_handles_padding_and_dilation() {
        assert_eq!(output_extent(16, 3, 1, 1, 1, 1), 16);
        assert_eq!(output_extent(16, 3, 1, 2, 0, 0), 12);
        assert_eq!(output_extent(7, 3, 2, 1, 0, 0), 3);
    }

    #[test]
    fn degenerate_output_extent_is_zero() {
        assert_eq!(output_extent(16, 3, 0, 1, 0, 0), 0);
        assert_eq!(output_extent(2, 5, 1, 1, 0, 0), 0);
    }

    #[test]
    fn validate_rejects_zero_extent() {
        let attrs = AttributeDescriptor::default();
        let kernel = Spatial3::new(5, 1, 1);
        let shape = ShapeDescriptor::infer(1, 4, Spatial3::splat(4), 8, kernel, &attrs);
        assert_eq!(shape.validate(&attrs), Err(ShapeError::ZeroExtent { name: "dout" }));
    }

    #[test]
    fn validate_checks_group_divisibility() {
        let attrs = AttributeDescriptor { groups: 3, ..AttributeDescriptor::default() };
        let shape = ShapeDescriptor::infer(1, 6, Spatial3::splat(4), 8, Spatial3::splat(1), &attrs);
        assert_eq!(
            shape.validate(&attrs),
            Err(ShapeError::ChannelsNotDivisible { name: "cout", channels: 8, groups: 3 })
        );

        let zero = AttributeDescriptor { groups: 0, ..AttributeDescriptor::default() };
        assert_eq!(shape.validate(&zero), Err(ShapeError::ZeroGroups));
    }

    #[test]
    fn conv1d_detection() {
        let attrs = AttributeDescriptor::default();
        let input = Spatial3::new(1, 1, 4096);
        let conv1d = ShapeDescriptor::infer(1, 16, input, 16, Spatial3::new(1, 1, 3), &attrs);
        assert!(conv1d.is_conv1d_over_width());
        let conv3d =
            ShapeDescriptor::infer(1, 16, Spatial3::splat(8), 16, Spatial3::splat(3), &attrs);
        assert!(!conv3d.is_conv1d_over_width());
    }
}
