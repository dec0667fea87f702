//! Divisor enumeration and core-count cross-mixing of candidate factors.

/// All divisors of `num` that do not exceed `max_allowed`, ascending.
///
/// `num == 0` has no meaningful divisor set and yields an empty vector.
#[must_use]
pub fn divisors_up_to(num: u64, max_allowed: u64) -> Vec<u64> {
    let mut divisors = Vec::new();
    if num == 0 {
        return divisors;
    }
    if max_allowed <= num / max_allowed.max(1) {
        // the bound sits below the square root: test each candidate directly.
        return (1..=max_allowed).filter(|&d| num.is_multiple_of(d)).collect();
    }
    let mut i = 1u64;
    while i <= num / i {
        if num.is_multiple_of(i) {
            if i <= max_allowed {
                divisors.push(i);
            }
            let pair = num / i;
            if pair != i && pair <= max_allowed {
                divisors.push(pair);
            }
        }
        i += 1;
    }
    divisors.sort_unstable();
    divisors
}

/// Widen `range` with every `reference` value not exceeding `org_dim`.
///
/// The result stays sorted and free of duplicates.
pub fn mix_with_reference(org_dim: u64, range: &mut Vec<u64>, reference: &[u64]) {
    range.extend(reference.iter().copied().filter(|&v| v <= org_dim));
    range.sort_unstable();
    range.dedup();
}
