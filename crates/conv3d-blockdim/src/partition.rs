//! Split modes, partition axes and partition factors.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// How the output spatial plane is partitioned across cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitMode {
    /// Output height and width fused into one `m` axis.
    MSplit,
    /// Output height and width partitioned separately.
    HwSplit,
}

impl SplitMode {
    /// Search order of the axes partitioned in this mode.
    #[must_use]
    pub const fn axes(self) -> &'static [Axis] {
        match self {
            Self::MSplit => &[Axis::Batch, Axis::M, Axis::Cout, Axis::Dout, Axis::Group],
            Self::HwSplit => {
                &[Axis::Batch, Axis::Ho, Axis::Wo, Axis::Cout, Axis::Dout, Axis::Group]
            }
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MSplit => "m-split",
            Self::HwSplit => "hw-split",
        })
    }
}

/// One logical axis a convolution can be split along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Batch,
    M,
    Ho,
    Wo,
    Cout,
    Dout,
    Group,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Batch => "batch",
            Self::M => "m",
            Self::Ho => "ho",
            Self::Wo => "wo",
            Self::Cout => "cout",
            Self::Dout => "dout",
            Self::Group => "group",
        })
    }
}

/// Spatial factors (or per-core extents) in either mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpatialSplit {
    Fused { m: u64 },
    Separate { ho: u64, wo: u64 },
}

/// Per-axis partition factors: how many cores share each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Partition {
    pub batch: u64,
    pub spatial: SpatialSplit,
    pub cout: u64,
    pub dout: u64,
    pub group: u64,
}

impl Partition {
    /// Every axis unsplit.
    #[must_use]
    pub const fn ones(mode: SplitMode) -> Self {
        let spatial = match mode {
            SplitMode::MSplit => SpatialSplit::Fused { m: 1 },
            SplitMode::HwSplit => SpatialSplit::Separate { ho: 1, wo: 1 },
        };
        Self { batch: 1, spatial, cout: 1, dout: 1, group: 1 }
    }

    #[must_use]
    pub const fn mode(&self) -> SplitMode {
        match self.spatial {
            SpatialSplit::Fused { .. } => SplitMode::MSplit,
            SpatialSplit::Separate { .. } => SplitMode::HwSplit,
        }
    }

    /// Factor along `axis`; axes of the other mode read as 1.
    #[must_use]
    pub const fn factor(&self, axis: Axis) -> u64 {
        match (axis, self.spatial) {
            (Axis::Batch, _) => self.batch,
            (Axis::Cout, _) => self.cout,
            (Axis::Dout, _) => self.dout,
            (Axis::Group, _) => self.group,
            (Axis::M, SpatialSplit::Fused { m }) => m,
            (Axis::Ho, SpatialSplit::Separate { ho, .. }) => ho,
            (Axis::Wo, SpatialSplit::Separate { wo, .. }) => wo,
            _ => 1,
        }
    }

    /// Set the factor along `axis`. Axes of the other mode are ignored.
    pub fn set_factor(&mut self, axis: Axis, value: u64) {
        let spatial = &mut self.spatial;
        match axis {
            Axis::Batch => self.batch = value,
            Axis::Cout => self.cout = value,
            Axis::Dout => self.dout = value,
            Axis::Group => self.group = value,
            Axis::M => {
                if let SpatialSplit::Fused { m } = spatial {
                    *m = value;
                }
            }
            Axis::Ho => {
                if let SpatialSplit::Separate { ho, .. } = spatial {
                    *ho = value;
                }
            }
            Axis::Wo => {
                if let SpatialSplit::Separate { wo, .. } = spatial {
                    *wo = value;
                }
            }
        }
    }

    /// Cores this partition occupies: the product of every factor.
    #[must_use]
    pub fn used_cores(&self) -> u64 {
        self.mode().axes().iter().fold(1u64, |acc, &axis| acc.saturating_mul(self.factor(axis)))
    }

    /// On equal cost, prefer more batch parallelism, then more depth
    /// parallelism. Neither axis reloads weights.
    #[must_use]
    pub fn prefers_on_tie(&self, incumbent: &Self) -> bool {
        self.batch.cmp(&incumbent.batch).then(self.dout.cmp(&incumbent.dout)) == Ordering::Greater
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for &axis in self.mode().axes() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{axis}={}", self.factor(axis))?;
        }
        Ok(())
    }
}

/// The chosen partition and the cost the search assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartitionResult {
    pub partition: Partition,
    pub min_cost: u64,
}
