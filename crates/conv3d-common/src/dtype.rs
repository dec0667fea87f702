//! Element types and the hardware matrix-multiply tile granularity table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a convolution operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float16,
    Bfloat16,
    Float32,
    Int8,
    Int32,
}

impl DataType {
    /// All supported element types.
    pub const ALL: &'static [DataType] = &[
        DataType::Float16,
        DataType::Bfloat16,
        DataType::Float32,
        DataType::Int8,
        DataType::Int32,
    ];

    /// Size of one element in bytes.
    #[must_use]
    pub const fn byte_size(self) -> u64 {
        match self {
            Self::Int8 => 1,
            Self::Float16 | Self::Bfloat16 => 2,
            Self::Float32 | Self::Int32 => 4,
        }
    }

    /// Hardware tile granularity for operands of this type.
    #[must_use]
    pub const fn granularity(self) -> TileGranularity {
        TileGranularity::for_dtype(self)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float16 => write!(f, "float16"),
            Self::Bfloat16 => write!(f, "bfloat16"),
            Self::Float32 => write!(f, "float32"),
            Self::Int8 => write!(f, "int8"),
            Self::Int32 => write!(f, "int32"),
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "float16" | "f16" | "fp16" => Ok(Self::Float16),
            "bfloat16" | "bf16" => Ok(Self::Bfloat16),
            "float32" | "f32" | "fp32" => Ok(Self::Float32),
            "int8" | "i8" => Ok(Self::Int8),
            "int32" | "i32" => Ok(Self::Int32),
            other => Err(format!("unknown data type: {other}")),
        }
    }
}

/// Native matrix-multiply tile shape (`m0 × k0 × n0`) of the cube unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileGranularity {
    /// Rows of one fractal (output spatial positions).
    pub m0: u64,
    /// Reduction depth of one fractal (input channels).
    pub k0: u64,
    /// Columns of one fractal (output channels).
    pub n0: u64,
}

/// Every fractal occupies 32 bytes along the reduction axis.
const FRACTAL_K_BYTES: u64 = 32;
const FRACTAL_MN: u64 = 16;

impl TileGranularity {
    /// Look up the granularity for `dtype`: `m0 = n0 = 16`, `k0 = 32 / bytes`.
    #[must_use]
    pub const fn for_dtype(dtype: DataType) -> Self {
        Self { m0: FRACTAL_MN, k0: FRACTAL_K_BYTES / dtype.byte_size(), n0: FRACTAL_MN }
    }
}
