//! Modular arithmetic whose result takes the sign of the divisor.
//!
//! Every ring cursor in the engine wraps through these, so a negative offset
//! (a write head computed behind the read head, a delay tap before zero)
//! lands inside the buffer instead of producing a negative index.

use core::f64::consts::PI;

/// Integer modulo with the result in `[0, y)` for positive `y`.
#[inline]
pub fn mod_int(x: i64, y: i64) -> i64 {
    ((x % y) + y) % y
}

/// Floating-point modulo with the sign of the divisor.
#[inline]
pub fn mod_float(x: f64, y: f64) -> f64 {
    x - y * libm::floor(x / y)
}

/// Wrap a phase into `(-π, π]`.
#[inline]
pub fn wrap_phase(phase: f64) -> f64 {
    mod_float(phase + PI, -2.0 * PI) + PI
}

/// Wrap a (possibly negative) position into a ring of `len` samples.
#[inline]
pub fn wrap_index(position: i64, len: usize) -> usize {
    mod_int(position, len as i64) as usize
}
