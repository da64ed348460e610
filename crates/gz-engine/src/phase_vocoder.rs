//! Phase vocoder time-scaler and pitch shifter.
//!
//! Input is resampled by the pitch ratio, collected into an analysis ring and
//! transformed one frame per analysis hop. Each frame's bin phases are
//! advanced by the bin's measured frequency times the synthesis hop, so the
//! frames can be overlap-added at a different hop than they were analysed at.
//! The caller owns overlap-add: after every frame it adds
//! [`PhaseVocoder::synthesis_frame`] at its write cursor and advances that
//! cursor by the returned hop.

use std::f64::consts::TAU;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use atomic_float::AtomicF32;
use gz_dsp::constants::{FFT_SIZE, MAX_PITCH_RATIO};
use gz_dsp::{fill_hann, window, wrap_phase, RoundedAccumulator, RoundingStrategy};
use realfft::num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::error::EngineError;
use crate::resampler::VariableRateResampler;
use crate::spectrum::Spectrum;

/// Lifecycle of a vocoder between resets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VocoderState {
    /// Nothing queued since the last reset.
    Uninitialized,
    /// Input is arriving but the analysis ring has not been filled yet.
    Accumulating,
    /// Every analysis hop produces a frame.
    Steady,
}

/// Convert a pitch shift in cents to a playback-rate ratio.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f64 {
    2f64.powf(cents as f64 / 1200.0)
}

/// The last `FFT_SIZE` resampled samples.
struct AnalysisRing {
    data: Vec<f32>,
    write_position: usize,
    filled: bool,
}

impl AnalysisRing {
    fn new(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
            write_position: 0,
            filled: false,
        }
    }

    fn push_hop(&mut self, hop: &[f32]) {
        let len = self.data.len();
        for &s in hop {
            self.data[self.write_position] = s;
            self.write_position += 1;
            if self.write_position == len {
                self.write_position = 0;
                self.filled = true;
            }
        }
    }

    /// Copy the ring oldest-first into `out`.
    fn copy_time_ordered(&self, out: &mut [f32]) {
        let (newer, older) = self.data.split_at(self.write_position);
        out[..older.len()].copy_from_slice(older);
        out[older.len()..].copy_from_slice(newer);
    }

    fn reset(&mut self) {
        self.write_position = 0;
        self.filled = false;
    }
}

/// Phases of the previous frame, before and after scaling.
struct PhaseMemory {
    unaltered: Vec<f64>,
    scaled: Vec<f64>,
    initialized: bool,
}

/// Time-scaling, pitch-shifting phase vocoder with a fixed frame size.
pub struct PhaseVocoder {
    effective_time_scale: f64,
    analysis_overlap: f64,
    analysis_hop: usize,

    pitch_cents: f32,
    queued_cents: AtomicF32,
    actual_time_scale: f64,
    synthesis_overlap: f64,
    synthesis_hop: RoundedAccumulator,
    amplitude_compensation: f32,

    resampler: VariableRateResampler,
    ring: AnalysisRing,
    phases: PhaseMemory,

    window: Vec<f32>,
    squared_window_sum: f64,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    frame: Vec<f32>,
    spectrum: Vec<Complex32>,
    forward_scratch: Vec<Complex32>,
    inverse_scratch: Vec<Complex32>,
}

impl PhaseVocoder {
    /// Create a vocoder that shortens its input by `effective_time_scale`
    /// (0.5 halves the duration) with `analysis_overlap` frames overlapping
    /// each analysis hop.
    pub fn new(effective_time_scale: f64, analysis_overlap: usize) -> Result<Self, EngineError> {
        debug_assert!(analysis_overlap.is_power_of_two() && analysis_overlap <= FFT_SIZE);
        let analysis_hop = FFT_SIZE / analysis_overlap;

        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(FFT_SIZE);
        let inverse = planner.plan_fft_inverse(FFT_SIZE);
        let mut spectrum = forward.make_output_vec();
        Spectrum::new(&mut spectrum, FFT_SIZE)?;
        let num_bins = spectrum.len();

        let mut window_data = vec![0.0; FFT_SIZE];
        fill_hann(&mut window_data);
        let squared_window_sum = window::squared_sum(&window_data);

        let mut vocoder = Self {
            effective_time_scale,
            analysis_overlap: analysis_overlap as f64,
            analysis_hop,
            pitch_cents: 0.0,
            queued_cents: AtomicF32::new(0.0),
            actual_time_scale: effective_time_scale,
            synthesis_overlap: analysis_overlap as f64,
            synthesis_hop: RoundedAccumulator::new(analysis_hop as f64, RoundingStrategy::RoundDown),
            amplitude_compensation: 0.0,
            resampler: VariableRateResampler::new(analysis_hop, MAX_PITCH_RATIO),
            ring: AnalysisRing::new(FFT_SIZE),
            phases: PhaseMemory {
                unaltered: vec![0.0; num_bins],
                scaled: vec![0.0; num_bins],
                initialized: false,
            },
            window: window_data,
            squared_window_sum,
            frame: forward.make_input_vec(),
            forward_scratch: forward.make_scratch_vec(),
            inverse_scratch: inverse.make_scratch_vec(),
            spectrum,
            forward,
            inverse,
        };
        vocoder.set_params(0.0);
        Ok(vocoder)
    }

    /// Set the pitch immediately, bypassing the queue. For use before
    /// processing starts.
    pub fn prepare(&mut self, pitch_cents: f32) {
        self.queued_cents.store(pitch_cents, Ordering::Release);
        self.set_params(pitch_cents);
    }

    /// Queue a pitch for the next frame boundary.
    #[inline]
    pub fn queue_params(&self, pitch_cents: f32) {
        self.queued_cents.store(pitch_cents, Ordering::Release);
    }

    /// Apply the queued pitch if it changed. Call only right after a frame.
    pub fn load_next_params(&mut self) {
        let cents = self.queued_cents.load(Ordering::Acquire);
        if cents != self.pitch_cents {
            self.set_params(cents);
        }
    }

    fn set_params(&mut self, pitch_cents: f32) {
        let ratio = cents_to_ratio(pitch_cents);
        self.pitch_cents = pitch_cents;
        self.actual_time_scale = self.effective_time_scale * ratio;
        self.synthesis_overlap = self.analysis_overlap / self.actual_time_scale;
        let synthesis_hop = self.analysis_hop as f64 * self.actual_time_scale;
        self.synthesis_hop.set_exact(synthesis_hop);
        self.amplitude_compensation = (synthesis_hop / self.squared_window_sum) as f32;
        self.resampler.update_pitch_ratio(ratio);
    }

    /// Feed one input sample. Returns the synthesis hop when a new frame is
    /// ready in [`Self::synthesis_frame`].
    ///
    /// With `skip_processing` the queue and ring advance as usual but no
    /// transform runs; the frame buffer keeps its previous contents.
    pub fn process_sample(&mut self, sample: f32, skip_processing: bool) -> Option<usize> {
        self.resampler.push(sample);
        if !self.resampler.produce_hop_if_ready() {
            return None;
        }
        self.ring.push_hop(self.resampler.hop());
        if !self.ring.filled {
            return None;
        }
        if !skip_processing {
            self.run_frame();
        }
        let hop = self.synthesis_hop.next_int();
        debug_assert!(hop > 0, "synthesis hop rounded to zero");
        Some(hop.max(0) as usize)
    }

    fn run_frame(&mut self) {
        self.ring.copy_time_ordered(&mut self.frame);
        for (s, &w) in self.frame.iter_mut().zip(&self.window) {
            *s *= w;
        }

        let forward = self
            .forward
            .process_with_scratch(&mut self.frame, &mut self.spectrum, &mut self.forward_scratch);
        debug_assert!(forward.is_ok());

        let mut spectrum = Spectrum::from_validated(&mut self.spectrum);
        let phases = &mut self.phases;
        if !phases.initialized {
            for k in 0..spectrum.len() {
                let phase = spectrum.phase(k) as f64;
                phases.unaltered[k] = phase;
                phases.scaled[k] = phase;
            }
            phases.initialized = true;
        } else {
            let n = FFT_SIZE as f64;
            let analysis_hop = self.analysis_hop as f64;
            for k in 0..spectrum.len() {
                let magnitude = spectrum.magnitude(k);
                let phase = spectrum.phase(k) as f64;

                let expected_advance = TAU * k as f64 / self.analysis_overlap;
                let deviation =
                    wrap_phase(phase - phases.unaltered[k] - expected_advance) / analysis_hop;
                let omega = TAU * k as f64 / n;
                let true_bin = (omega + deviation) * n / TAU;
                let scaled = wrap_phase(phases.scaled[k] + true_bin * TAU / self.synthesis_overlap);

                phases.unaltered[k] = phase;
                phases.scaled[k] = scaled;
                spectrum.set_polar(k, magnitude, scaled as f32);
            }
        }
        spectrum.clear_edge_imaginary();

        let inverse = self
            .inverse
            .process_with_scratch(&mut self.spectrum, &mut self.frame, &mut self.inverse_scratch);
        debug_assert!(inverse.is_ok());

        let scale = self.amplitude_compensation / FFT_SIZE as f32;
        for (s, &w) in self.frame.iter_mut().zip(&self.window) {
            *s *= w * scale;
        }
    }

    /// The most recent synthesis frame, `FFT_SIZE` samples long.
    pub fn synthesis_frame(&self) -> &[f32] {
        &self.frame
    }

    pub fn state(&self) -> VocoderState {
        if self.ring.filled {
            VocoderState::Steady
        } else if self.ring.write_position > 0 || self.resampler.queued() > 0 {
            VocoderState::Accumulating
        } else {
            VocoderState::Uninitialized
        }
    }

    pub fn pitch_cents(&self) -> f32 {
        self.pitch_cents
    }

    pub fn pitch_ratio(&self) -> f64 {
        self.resampler.ratio()
    }

    /// Effective time scale multiplied by the pitch ratio.
    pub fn actual_time_scale(&self) -> f64 {
        self.actual_time_scale
    }

    /// Unrounded synthesis hop in samples.
    pub fn synthesis_hop(&self) -> f64 {
        self.synthesis_hop.exact()
    }

    pub fn analysis_hop(&self) -> usize {
        self.analysis_hop
    }

    /// Start a new beat: phases and ring restart, queued input is kept.
    pub fn reset_between_beats(&mut self) {
        self.phases.initialized = false;
        self.ring.reset();
        self.resampler.reset_between_beats();
        self.synthesis_hop.reset();
    }

    /// Cold start: apply the queued pitch and drop all buffered input.
    pub fn full_reset(&mut self) {
        self.load_next_params();
        self.resampler.full_reset();
        self.reset_between_beats();
    }
}
