//! Typed view over the bins of a real FFT.

use realfft::num_complex::Complex32;

use crate::error::EngineError;

/// Mutable view of the `fft_size / 2 + 1` complex bins of one frame.
///
/// The bin count is checked once when the view is built; indexing through it
/// afterwards cannot go past the Nyquist bin.
pub struct Spectrum<'a> {
    bins: &'a mut [Complex32],
}

impl<'a> Spectrum<'a> {
    pub fn new(bins: &'a mut [Complex32], fft_size: usize) -> Result<Self, EngineError> {
        let expected = fft_size / 2 + 1;
        if bins.len() != expected {
            return Err(EngineError::SpectrumSize {
                expected,
                actual: bins.len(),
            });
        }
        Ok(Self { bins })
    }

    /// Wrap bins whose length was already checked by [`Spectrum::new`].
    #[inline]
    pub(crate) fn from_validated(bins: &'a mut [Complex32]) -> Self {
        debug_assert!(bins.len() > 1);
        Self { bins }
    }

    /// Number of bins, DC through Nyquist.
    #[inline]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    #[inline]
    pub fn magnitude(&self, bin: usize) -> f32 {
        self.bins[bin].norm()
    }

    #[inline]
    pub fn phase(&self, bin: usize) -> f32 {
        self.bins[bin].arg()
    }

    #[inline]
    pub fn set_polar(&mut self, bin: usize, magnitude: f32, phase: f32) {
        self.bins[bin] = Complex32::from_polar(magnitude, phase);
    }

    /// Zero the imaginary parts of the DC and Nyquist bins, which a real
    /// inverse transform requires.
    pub fn clear_edge_imaginary(&mut self) {
        let last = self.bins.len() - 1;
        self.bins[0].im = 0.0;
        self.bins[last].im = 0.0;
    }
}
