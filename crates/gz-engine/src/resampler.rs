//! Variable-rate resampler feeding the phase vocoder.
//!
//! Raw input is queued one sample at a time. Whenever enough is queued to
//! produce a full hop at the current pitch ratio, the interpolator consumes
//! the samples it needs and emits exactly one hop. Leftover input is moved to
//! the front of the queue and survives beat resets.

use gz_dsp::CatmullRomInterpolator;

/// Worst-case raw samples needed to emit one hop when the ratio moves from
/// `old_ratio` to `new_ratio`.
pub fn max_needed_samples(hop_size: usize, new_ratio: f64, old_ratio: f64) -> usize {
    (hop_size as f64 * new_ratio + 2.0 * new_ratio + 2.0 * old_ratio).ceil() as usize
}

/// Resamples queued input into fixed-size hops at a variable ratio.
pub struct VariableRateResampler {
    interpolator: CatmullRomInterpolator,
    queue: Vec<f32>,
    write_position: usize,
    hop: Vec<f32>,
    ratio: f64,
    max_needed: usize,
}

impl VariableRateResampler {
    /// Create a resampler emitting hops of `hop_size` samples at ratios up to
    /// `max_ratio`.
    pub fn new(hop_size: usize, max_ratio: f64) -> Self {
        let capacity = max_needed_samples(hop_size, max_ratio, max_ratio) + 1;
        Self {
            interpolator: CatmullRomInterpolator::new(),
            queue: vec![0.0; capacity],
            write_position: 0,
            hop: vec![0.0; hop_size],
            ratio: 1.0,
            max_needed: max_needed_samples(hop_size, 1.0, 1.0),
        }
    }

    /// Queue one raw input sample.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        debug_assert!(self.write_position < self.queue.len(), "resampler queue overflow");
        if let Some(slot) = self.queue.get_mut(self.write_position) {
            *slot = sample;
            self.write_position += 1;
        }
    }

    /// Switch to a new pitch ratio. Must precede the next hop produced at it.
    pub fn update_pitch_ratio(&mut self, new_ratio: f64) {
        self.max_needed = max_needed_samples(self.hop.len(), new_ratio, self.ratio);
        debug_assert!(self.max_needed < self.queue.len(), "ratio {new_ratio} exceeds capacity");
        self.ratio = new_ratio;
    }

    /// Emit one hop into [`Self::hop`] if enough input is queued.
    pub fn produce_hop_if_ready(&mut self) -> bool {
        if self.write_position <= self.max_needed {
            return false;
        }
        let used = self.interpolator.process(
            self.ratio,
            &self.queue[..self.write_position],
            &mut self.hop,
        );
        let used = used.min(self.write_position);
        self.queue.copy_within(used..self.write_position, 0);
        self.write_position -= used;
        true
    }

    /// The most recently produced hop.
    pub fn hop(&self) -> &[f32] {
        &self.hop
    }

    pub fn hop_size(&self) -> usize {
        self.hop.len()
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Number of raw samples waiting in the queue.
    pub fn queued(&self) -> usize {
        self.write_position
    }

    /// Reset interpolation state only; queued input is kept.
    pub fn reset_between_beats(&mut self) {
        self.interpolator.reset();
    }

    /// Reset everything, including queued input.
    pub fn full_reset(&mut self) {
        self.interpolator.reset();
        self.write_position = 0;
        self.hop.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_until_hop(r: &mut VariableRateResampler, mut next: impl FnMut() -> f32) -> usize {
        let mut pushed = 0;
        loop {
            r.push(next());
            pushed += 1;
            if r.produce_hop_if_ready() {
                return pushed;
            }
        }
    }

    #[test]
    fn unity_ratio_copies_input() {
        let mut r = VariableRateResampler::new(64, 16.0);
        let mut n = 0.0f32;
        feed_until_hop(&mut r, || {
            n += 1.0;
            n
        });
        let expected: Vec<f32> = (1..=64).map(|i| i as f32).collect();
        assert_eq!(r.hop(), &expected[..]);
    }

    #[test]
    fn waits_for_worst_case_before_first_hop() {
        let mut r = VariableRateResampler::new(256, 16.0);
        let pushed = feed_until_hop(&mut r, || 0.0);
        assert_eq!(pushed, max_needed_samples(256, 1.0, 1.0) + 1);
    }

    #[test]
    fn consumes_about_hop_times_ratio_per_hop() {
        let mut r = VariableRateResampler::new(128, 16.0);
        r.update_pitch_ratio(2.0);
        r.update_pitch_ratio(2.0);
        let mut total = 0;
        for _ in 0..20 {
            total += feed_until_hop(&mut r, || 0.25);
        }
        // After the initial fill, each hop costs 256 raw samples.
        let steady = total - max_needed_samples(128, 2.0, 2.0);
        assert!((steady as i64 - 19 * 256).abs() <= 2, "steady {steady}");
    }

    #[test]
    fn queue_never_overflows_across_ratio_jumps() {
        let mut r = VariableRateResampler::new(256, 16.0);
        let ratios = [1.0, 16.0, 0.25, 16.0, 1.5, 0.25];
        for &ratio in &ratios {
            r.update_pitch_ratio(ratio);
            for _ in 0..5 {
                feed_until_hop(&mut r, || 0.0);
                assert!(r.queued() < r.queue.len());
            }
        }
    }

    #[test]
    fn beat_reset_keeps_queue_full_reset_clears_it() {
        let mut r = VariableRateResampler::new(32, 16.0);
        for _ in 0..10 {
            r.push(1.0);
        }
        r.reset_between_beats();
        assert_eq!(r.queued(), 10);
        r.full_reset();
        assert_eq!(r.queued(), 0);
        assert!(r.hop().iter().all(|&s| s == 0.0));
    }
}
