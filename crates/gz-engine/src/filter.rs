//! Per-level tone filters: a low-pass followed by a high-pass.
//!
//! Both are Butterworth biquads. Cutoff changes are collected every sample
//! but coefficients are recomputed at most once per
//! [`FILTER_UPDATE_INTERVAL`] samples.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};
use gz_dsp::constants::FILTER_UPDATE_INTERVAL;

use crate::params::{ParamValue, MIN_CUTOFF_HZ};

/// Highest usable cutoff as a fraction of the sample rate.
const MAX_CUTOFF_RATIO: f32 = 0.49;

fn coefficients(filter_type: Type<f32>, sample_rate: f32, cutoff: f32) -> Coefficients<f32> {
    let cutoff = clamp_cutoff(cutoff, sample_rate);
    match Coefficients::<f32>::from_params(filter_type, sample_rate.hz(), cutoff.hz(), Q_BUTTERWORTH_F32) {
        Ok(c) => c,
        // Unreachable once clamped; fall back to a pass-through.
        Err(_) => Coefficients {
            a1: 0.0,
            a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        },
    }
}

/// Keep a cutoff inside `[MIN_CUTOFF_HZ, just below Nyquist]`.
pub fn clamp_cutoff(cutoff: f32, sample_rate: f32) -> f32 {
    cutoff.clamp(MIN_CUTOFF_HZ, sample_rate * MAX_CUTOFF_RATIO)
}

/// Low-pass into high-pass with rate-limited coefficient updates.
pub struct FilterPair {
    sample_rate: f32,
    low_pass: DirectForm2Transposed<f32>,
    high_pass: DirectForm2Transposed<f32>,
    low_pass_coefficients: Coefficients<f32>,
    high_pass_coefficients: Coefficients<f32>,
    low_cutoff: f32,
    high_cutoff: f32,
    pending_low: Option<f32>,
    pending_high: Option<f32>,
    samples_since_update: usize,
}

impl FilterPair {
    pub fn new(sample_rate: f32, low_pass_hz: f32, high_pass_hz: f32) -> Self {
        let lp = coefficients(Type::LowPass, sample_rate, low_pass_hz);
        let hp = coefficients(Type::HighPass, sample_rate, high_pass_hz);
        Self {
            sample_rate,
            low_pass: DirectForm2Transposed::<f32>::new(lp),
            high_pass: DirectForm2Transposed::<f32>::new(hp),
            low_pass_coefficients: lp,
            high_pass_coefficients: hp,
            low_cutoff: clamp_cutoff(low_pass_hz, sample_rate),
            high_cutoff: clamp_cutoff(high_pass_hz, sample_rate),
            pending_low: None,
            pending_high: None,
            samples_since_update: 0,
        }
    }

    /// Offer this sample's cutoffs. Changed values are applied once the
    /// update interval has elapsed.
    #[inline]
    pub fn update(&mut self, low_pass: ParamValue, high_pass: ParamValue) {
        if low_pass.changed {
            self.pending_low = Some(clamp_cutoff(low_pass.value, self.sample_rate));
        }
        if high_pass.changed {
            self.pending_high = Some(clamp_cutoff(high_pass.value, self.sample_rate));
        }
        self.samples_since_update += 1;
        if self.samples_since_update < FILTER_UPDATE_INTERVAL {
            return;
        }
        if let Some(cutoff) = self.pending_low.take() {
            if cutoff != self.low_cutoff {
                self.low_cutoff = cutoff;
                self.low_pass_coefficients = coefficients(Type::LowPass, self.sample_rate, cutoff);
                self.low_pass.update_coefficients(self.low_pass_coefficients);
                self.samples_since_update = 0;
            }
        }
        if let Some(cutoff) = self.pending_high.take() {
            if cutoff != self.high_cutoff {
                self.high_cutoff = cutoff;
                self.high_pass_coefficients = coefficients(Type::HighPass, self.sample_rate, cutoff);
                self.high_pass.update_coefficients(self.high_pass_coefficients);
                self.samples_since_update = 0;
            }
        }
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        self.high_pass.run(self.low_pass.run(sample))
    }

    /// Clear filter memory; cutoffs are kept.
    pub fn reset(&mut self) {
        self.low_pass = DirectForm2Transposed::<f32>::new(self.low_pass_coefficients);
        self.high_pass = DirectForm2Transposed::<f32>::new(self.high_pass_coefficients);
        self.pending_low = None;
        self.pending_high = None;
        self.samples_since_update = 0;
    }

    pub fn low_cutoff(&self) -> f32 {
        self.low_cutoff
    }

    pub fn high_cutoff(&self) -> f32 {
        self.high_cutoff
    }
}
