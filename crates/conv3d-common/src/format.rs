//! Tensor memory layouts understood by the convolution kernels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout of the input feature map (and the output, which always matches it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureMapFormat {
    Ncdhw,
    Ndhwc,
    /// Native 6-D layout with channels split into `C1 × C0` fractals.
    Ndc1hwc0,
    /// 2-D convolution routed through the 3-D kernels.
    Nchw,
    Nhwc,
}

impl FeatureMapFormat {
    /// Whether the layout carries a depth axis.
    #[must_use]
    pub const fn has_depth(self) -> bool {
        matches!(self, Self::Ncdhw | Self::Ndhwc | Self::Ndc1hwc0)
    }

    /// Channels are the outermost non-batch axis.
    #[must_use]
    pub const fn is_channel_major(self) -> bool {
        matches!(self, Self::Ncdhw | Self::Nchw)
    }

    /// Channels are the innermost axis.
    #[must_use]
    pub const fn is_channel_last(self) -> bool {
        matches!(self, Self::Ndhwc | Self::Nhwc)
    }
}

impl fmt::Display for FeatureMapFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ncdhw => write!(f, "NCDHW"),
            Self::Ndhwc => write!(f, "NDHWC"),
            Self::Ndc1hwc0 => write!(f, "NDC1HWC0"),
            Self::Nchw => write!(f, "NCHW"),
            Self::Nhwc => write!(f, "NHWC"),
        }
    }
}

impl std::str::FromStr for FeatureMapFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NCDHW" => Ok(Self::Ncdhw),
            "NDHWC" => Ok(Self::Ndhwc),
            "NDC1HWC0" => Ok(Self::Ndc1hwc0),
            "NCHW" => Ok(Self::Nchw),
            "NHWC" => Ok(Self::Nhwc),
            other => Err(format!("unknown feature map format: {other}")),
        }
    }
}

/// Layout of the weight tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeightFormat {
    Ncdhw,
    Dhwcn,
    /// Pre-transposed into the cube unit's fractal layout.
    #[serde(rename = "FRACTAL_Z_3D")]
    FractalZ3d,
}

impl WeightFormat {
    /// Weights are already in the layout the matrix engine consumes.
    #[must_use]
    pub const fn is_native(self) -> bool {
        matches!(self, Self::FractalZ3d)
    }
}

impl fmt::Display for WeightFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ncdhw => write!(f, "NCDHW"),
            Self::Dhwcn => write!(f, "DHWCN"),
            Self::FractalZ3d => write!(f, "FRACTAL_Z_3D"),
        }
    }
}

impl std::str::FromStr for WeightFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NCDHW" => Ok(Self::Ncdhw),
            "DHWCN" => Ok(Self::Dhwcn),
            "FRACTAL_Z_3D" | "FRACTALZ3D" => Ok(Self::FractalZ3d),
            other => Err(format!("unknown weight format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_axis_only_for_3d_layouts() {
        assert!(FeatureMapFormat::Ncdhw.has_depth());
        assert!(FeatureMapFormat::Ndc1hwc0.has_depth());
        assert!(!FeatureMapFormat::Nchw.has_depth());
        assert!(!FeatureMapFormat::Nhwc.has_depth());
    }

    #[test]
    fn channel_placement() {
        assert!(FeatureMapFormat::Ncdhw.is_channel_major());
        assert!(!FeatureMapFormat::Ndc1hwc0.is_channel_major());
        assert!(!FeatureMapFormat::Ndc1hwc0.is_channel_last());
        assert!(FeatureMapFormat::Ndhwc.is_channel_last());
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("ncdhw".parse::<FeatureMapFormat>().unwrap(), FeatureMapFormat::Ncdhw);
        assert_eq!("fractal_z_3d".parse::<WeightFormat>().unwrap(), WeightFormat::FractalZ3d);
        assert!("NC1HWC0".parse::<FeatureMapFormat>().is_err());
    }
}
