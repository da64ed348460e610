//! Beat grid tracking.
//!
//! Beats are numbered from 1. Beat `n` covers the half-open sample range
//! `[round(spb * (n - 1)), round(spb * n))`, so consecutive beats tile the
//! timeline exactly and the position of beat `n` never depends on how the
//! lengths of earlier beats were rounded.

/// Position within the beat grid.
#[derive(Clone, Debug)]
pub struct BeatClock {
    samples_per_beat: f64,
    beat_number: u64,
    beat_sample_start: i64,
    beat_sample_end: i64,
    samples_into_beat: usize,
    second_of_pair: bool,
}

impl BeatClock {
    pub fn new(samples_per_beat: f64) -> Self {
        let mut clock = Self {
            samples_per_beat,
            beat_number: 0,
            beat_sample_start: 0,
            beat_sample_end: 0,
            samples_into_beat: 0,
            second_of_pair: true,
        };
        clock.reset(samples_per_beat);
        clock
    }

    /// Restart at the first sample of beat 1 (an A beat).
    pub fn reset(&mut self, samples_per_beat: f64) {
        debug_assert!(samples_per_beat >= 1.0);
        self.samples_per_beat = samples_per_beat;
        self.beat_number = 0;
        self.beat_sample_end = 0;
        self.second_of_pair = true;
        self.next_beat();
    }

    /// Advance to the following beat.
    pub fn next_beat(&mut self) {
        self.beat_number += 1;
        self.beat_sample_start = self.beat_sample_end;
        self.beat_sample_end = libm::round(self.samples_per_beat * self.beat_number as f64) as i64;
        self.samples_into_beat = 0;
        self.second_of_pair = !self.second_of_pair;
    }

    /// Count one processed sample.
    #[inline]
    pub fn advance_one_sample(&mut self) {
        self.samples_into_beat += 1;
    }

    /// True once every sample of the current beat has been counted.
    #[inline]
    pub fn is_at_beat_boundary(&self) -> bool {
        self.samples_into_beat >= self.beat_sample_length()
    }

    /// Jump within the current beat.
    pub fn set_samples_into_beat(&mut self, samples: usize) {
        debug_assert!(samples < self.beat_sample_length().max(1));
        self.samples_into_beat = samples;
    }

    /// Skip `beats` whole beats at once.
    pub fn skip_beats(&mut self, beats: u64) {
        if beats == 0 {
            return;
        }
        self.beat_number += beats - 1;
        self.beat_sample_end = libm::round(self.samples_per_beat * self.beat_number as f64) as i64;
        if beats % 2 == 0 {
            self.second_of_pair = !self.second_of_pair;
        }
        self.next_beat();
    }

    pub fn samples_per_beat(&self) -> f64 {
        self.samples_per_beat
    }

    /// 1-based index of the current beat.
    pub fn beat_number(&self) -> u64 {
        self.beat_number
    }

    /// First sample of the current beat on the absolute timeline.
    pub fn beat_sample_start(&self) -> i64 {
        self.beat_sample_start
    }

    /// One past the last sample of the current beat.
    pub fn beat_sample_end(&self) -> i64 {
        self.beat_sample_end
    }

    /// Number of samples in the current beat.
    #[inline]
    pub fn beat_sample_length(&self) -> usize {
        (self.beat_sample_end - self.beat_sample_start) as usize
    }

    #[inline]
    pub fn samples_into_beat(&self) -> usize {
        self.samples_into_beat
    }

    /// True during the second beat (B) of a beat pair.
    #[inline]
    pub fn is_beat_b(&self) -> bool {
        self.second_of_pair
    }
}
