//! Block-dimension decision error types.

use crate::feasibility::ModeRejection;
use conv3d_common::{PlatformError, ShapeError};
use thiserror::Error;

/// Errors produced while deciding the block dimensions of a convolution.
#[derive(Debug, Error)]
pub enum BlockDimError {
    #[error("invalid convolution shape: {0}")]
    InvalidShape(#[from] ShapeError),

    #[error("invalid platform: {0}")]
    InvalidPlatform(#[from] PlatformError),

    /// Neither partitioning mode fits this shape on this platform. Tiling, and
    /// therefore kernel generation, must be aborted.
    #[error("no feasible partitioning: m-split rejected ({m_split}); hw-split rejected ({hw_split})")]
    NoFeasibleMode { m_split: ModeRejection, hw_split: ModeRejection },
}

impl BlockDimError {
    /// The shape cannot be tiled on this platform at all.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::NoFeasibleMode { .. })
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, BlockDimError>;
