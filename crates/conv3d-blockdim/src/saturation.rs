//! Raise the height factor of an HW-split partition into idle cores.

use crate::partition::{Partition, SpatialSplit};
use tracing::debug;

/// Raise the height factor to the largest `spare` value that still fits the
/// core count, when the partition leaves cores idle.
///
/// Only the height factor moves, even when width is partitioned too. Width
/// counts against the core budget but not towards "already saturated".
/// Returns whether the partition changed. Fused partitions are left alone.
pub fn saturate_height(partition: &mut Partition, spare: &[u64], cores: u64) -> bool {
    let SpatialSplit::Separate { ho, wo } = partition.spatial else {
        return false;
    };
    let shared = partition
        .batch
        .saturating_mul(partition.cout)
        .saturating_mul(partition.dout)
        .saturating_mul(partition.group);
    if shared.saturating_mul(ho) == cores {
        return false;
    }

    let others = shared.saturating_mul(wo);
    let fits = |v: u64| v > ho && v.saturating_mul(others) <= cores;
    let Some(raised) = spare.iter().copied().filter(|&v| fits(v)).max() else {
        return false;
    };
    debug!(from = ho, to = raised, cores, "height factor raised into idle cores");
    partition.spatial = SpatialSplit::Separate { ho: raised, wo };
    true
}
