//! Integer helpers shared by the shape and tiling code.
//!
//! All helpers return `0` when the divisor is zero instead of panicking, so a
//! degenerate stride or granularity yields a defined value.

/// Ceiling division. Returns `0` when `b == 0`.
#[inline]
pub const fn ceil_div(a: u64, b: u64) -> u64 {
    if b == 0 { 0 } else { a.div_ceil(b) }
}

/// Floor division. Returns `0` when `b == 0`.
#[inline]
pub const fn floor_div(a: u64, b: u64) -> u64 {
    if b == 0 { 0 } else { a / b }
}

/// Round `a` up to the next multiple of `b`. Returns `0` when `b == 0`.
#[inline]
pub const fn align_up(a: u64, b: u64) -> u64 {
    ceil_div(a, b).saturating_mul(b)
}
