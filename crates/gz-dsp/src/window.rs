//! Window functions.

use core::f64::consts::PI;

/// Tukey (tapered cosine) window evaluated at sample `x` of a window
/// `length` samples long.
///
/// `alpha` is the tapered fraction: 0 is rectangular, 1 is a Hann window.
/// Positions outside `[0, length - 1]` evaluate to 0.
pub fn tukey(x: f64, length: f64, alpha: f64) -> f64 {
    if alpha <= 0.0 {
        return 1.0;
    }
    if x < 0.0 {
        return 0.0;
    }
    let last = length - 1.0;
    if x < alpha * last / 2.0 {
        0.5 * (1.0 + libm::cos(PI * (2.0 * x / (alpha * last) - 1.0)))
    } else if x <= last * (1.0 - alpha / 2.0) {
        1.0
    } else if x <= last {
        0.5 * (1.0 + libm::cos(PI * (2.0 * x / (alpha * last) - 2.0 / alpha + 1.0)))
    } else {
        0.0
    }
}

/// Fill `window` with a non-symmetric (periodic) Hann window, the variant
/// whose shifted copies at `len / 4` hops sum to a constant.
pub fn fill_hann(window: &mut [f32]) {
    let len = window.len() as f64;
    for (n, w) in window.iter_mut().enumerate() {
        *w = (0.5 - 0.5 * libm::cos(2.0 * PI * n as f64 / len)) as f32;
    }
}

/// Sum of squared window samples.
pub fn squared_sum(window: &[f32]) -> f64 {
    window.iter().map(|&w| w as f64 * w as f64).sum()
}
