//! Limits shared by every crate in the workspace.

/// Number of subdivision levels the engine can run (2x, 4x, 8x, 16x).
pub const MAX_LEVELS: usize = 4;

/// Lowest supported tempo. Sizes every tempo-dependent buffer.
pub const MIN_BPM: f32 = 30.0;

/// Highest supported tempo.
pub const MAX_BPM: f32 = 1000.0;

/// Pitch shift range in cents.
pub const MIN_PITCH_CENTS: f32 = -2400.0;
pub const MAX_PITCH_CENTS: f32 = 4800.0;

/// Pitch ratio at [`MAX_PITCH_CENTS`]; bounds resampler input per hop.
pub const MAX_PITCH_RATIO: f64 = 16.0;

/// log2 of the phase vocoder frame size.
pub const FFT_ORDER: u32 = 10;

/// Phase vocoder frame size.
pub const FFT_SIZE: usize = 1 << FFT_ORDER;

/// Number of complex bins produced by a real FFT of [`FFT_SIZE`].
pub const NUM_BINS: usize = FFT_SIZE / 2 + 1;

/// Filter coefficients are recomputed at most once per this many samples.
pub const FILTER_UPDATE_INTERVAL: usize = 32;

/// Samples per beat at [`MIN_BPM`], rounded up.
pub fn max_samples_per_beat(sample_rate: f64) -> usize {
    libm::ceil(sample_rate * 60.0 / MIN_BPM as f64) as usize
}

/// Fractional samples per beat at `bpm`.
pub fn samples_per_beat(sample_rate: f64, bpm: f32) -> f64 {
    sample_rate * 60.0 / bpm as f64
}
