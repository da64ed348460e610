//! Integer stepping through a fractional quantity without drift.

/// How the accumulated value is turned into an integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoundingStrategy {
    /// Floor; the carried remainder is always in `[0, 1)`.
    #[default]
    RoundDown,
    /// Truncate; the carried remainder keeps the sign of the value.
    TowardZero,
}

impl RoundingStrategy {
    /// Split `value` into its rounded integer part and the remainder to carry.
    #[inline]
    pub fn split(self, value: f64) -> (f64, f64) {
        let rounded = match self {
            RoundingStrategy::RoundDown => libm::floor(value),
            RoundingStrategy::TowardZero => libm::trunc(value),
        };
        (rounded, value - rounded)
    }
}

/// A fractional value handed out as integers, carrying the rounding error
/// from one call to the next so the sum of `n` results stays within one of
/// `n * exact`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundedAccumulator {
    exact: f64,
    remainder: f64,
    strategy: RoundingStrategy,
}

impl RoundedAccumulator {
    pub fn new(exact: f64, strategy: RoundingStrategy) -> Self {
        Self {
            exact,
            remainder: 0.0,
            strategy,
        }
    }

    /// The unrounded value.
    pub fn exact(&self) -> f64 {
        self.exact
    }

    /// Change the value. The carried remainder is kept.
    pub fn set_exact(&mut self, exact: f64) {
        self.exact = exact;
    }

    /// Next integer step.
    #[inline]
    pub fn next_int(&mut self) -> i64 {
        let (rounded, remainder) = self.strategy.split(self.exact + self.remainder);
        self.remainder = remainder;
        rounded as i64
    }

    /// Drop the carried remainder; the exact value is kept.
    pub fn reset(&mut self) {
        self.remainder = 0.0;
    }
}
