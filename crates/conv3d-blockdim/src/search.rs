//! Exhaustive backtracking over the candidate ranges.

use crate::cost::CostModel;
use crate::partition::{Axis, Partition, PartitionResult, SplitMode};
use crate::range::BlockDimRange;
use tracing::{debug, trace};

/// Working state of one search. Lives only inside [`search`].
struct SearchState<'s> {
    model: &'s CostModel<'s>,
    axes: &'static [Axis],
    range: &'s BlockDimRange,
    cores: u64,
    record: Partition,
    best: PartitionResult,
    evaluated: u64,
}

impl SearchState<'_> {
    fn descend(&mut self, depth: usize, used: u64) {
        let Some(&axis) = self.axes.get(depth) else {
            self.evaluate();
            return;
        };
        let range = self.range;
        for &factor in range.candidates(axis) {
            let next = used.saturating_mul(factor);
            // candidates ascend, so every later sibling overflows too.
            if next > self.cores {
                break;
            }
            self.record.set_factor(axis, factor);
            self.descend(depth + 1, next);
        }
        self.record.set_factor(axis, 1);
    }

    fn evaluate(&mut self) {
        self.evaluated += 1;
        let cost = self.model.cost(&self.record);
        let best = &self.best;
        let improves = cost < best.min_cost
            || (cost == best.min_cost && self.record.prefers_on_tie(&best.partition));
        if improves {
            trace!(partition = %self.record, cost, "search improved");
            self.best = PartitionResult { partition: self.record, min_cost: cost };
        }
    }
}

/// Find the cheapest partition whose factors multiply to at most `cores`.
///
/// Starts from the all-ones partition, so a result always exists.
#[must_use]
pub fn search(
    model: &CostModel<'_>,
    range: &BlockDimRange,
    mode: SplitMode,
    cores: u64,
) -> PartitionResult {
    let ones = Partition::ones(mode);
    let mut state = SearchState {
        model,
        axes: mode.axes(),
        range,
        cores,
        record: ones,
        best: PartitionResult { partition: ones, min_cost: model.cost(&ones) },
        evaluated: 0,
    };
    state.descend(0, 1);
    debug!(
        %mode,
        evaluated = state.evaluated,
        space = range.search_space(mode),
        partition = %state.best.partition,
        cost = state.best.min_cost,
        "search finished"
    );
    state.best
}
