//! One subdivision level: the 2x, 4x, 8x or 16x layer.
//!
//! A level owns a phase vocoder compressing each beat into a note
//! `2^(level+1)` times shorter, and overlap-adds every synthesis frame into
//! the shared output ring once per note copy. Within a beat pair (A, B) the
//! notes of beat A land in the odd note slots and the notes of beat B in the
//! even ones, so the pair is heard as `A B A B ...` at the level's tempo.

use gz_dsp::constants::{FFT_SIZE, MAX_PITCH_RATIO};
use gz_dsp::modulo::wrap_index;
use gz_dsp::BeatClock;

use crate::error::EngineError;
use crate::filter::FilterPair;
use crate::output_ring::SharedOutputRing;
use crate::params::{ParamValue, NOTES_PER_PAIR};
use crate::phase_vocoder::PhaseVocoder;

/// Upper bound on zeros fed while flushing the last hop of a beat.
const MAX_FLUSH_SAMPLES: usize = FFT_SIZE * MAX_PITCH_RATIO as usize * 2;

/// Position of a note copy within its beat pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteSlot {
    First,
    Second,
    Third,
    Fourth,
}

impl NoteSlot {
    /// Slot of note `copy` (0-based, within one beat) of beat A or B.
    ///
    /// Copies alternate between the first and second half of the pair's
    /// pattern: even copies of A are first notes, even copies of B second
    /// notes, odd copies of A third notes and odd copies of B fourth notes.
    pub fn for_copy(copy: usize, beat_b: bool) -> Self {
        match (copy % 2 == 0, beat_b) {
            (true, false) => NoteSlot::First,
            (true, true) => NoteSlot::Second,
            (false, false) => NoteSlot::Third,
            (false, true) => NoteSlot::Fourth,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Which of a level's four note slots are silenced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteDrops(pub [bool; NOTES_PER_PAIR]);

impl NoteDrops {
    #[inline]
    pub fn contains(self, slot: NoteSlot) -> bool {
        self.0[slot.index()]
    }
}

/// Everything a level borrows from the engine while processing.
pub struct LevelContext<'a> {
    pub clock: &'a BeatClock,
    pub ring: &'a mut SharedOutputRing,
    pub drops: NoteDrops,
}

pub struct SubdivisionLevel {
    level: usize,
    power_of_two: usize,
    notes_to_jump_over: usize,
    vocoder: PhaseVocoder,
    filters: FilterPair,
    write_position: usize,
    ring_len: usize,
    accumulated_this_beat: usize,
    note_length: usize,
    note_length_fractional: f64,
}

impl SubdivisionLevel {
    pub fn new(
        level: usize,
        sample_rate: f32,
        ring_len: usize,
        low_pass_hz: f32,
        high_pass_hz: f32,
    ) -> Result<Self, EngineError> {
        let power_of_two = 1usize << (level + 1);
        let analysis_overlap = power_of_two.max(4);
        Ok(Self {
            level,
            power_of_two,
            notes_to_jump_over: (1usize << (level + 2)) - 2,
            vocoder: PhaseVocoder::new(1.0 / power_of_two as f64, analysis_overlap)?,
            filters: FilterPair::new(sample_rate, low_pass_hz, high_pass_hz),
            write_position: 0,
            ring_len,
            accumulated_this_beat: 0,
            note_length: 0,
            note_length_fractional: 0.0,
        })
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Number of copies of each compressed beat, `2^(level+1)`.
    pub fn power_of_two(&self) -> usize {
        self.power_of_two
    }

    pub fn write_position(&self) -> usize {
        self.write_position
    }

    pub fn set_write_position(&mut self, position: i64) {
        self.write_position = wrap_index(position, self.ring_len);
    }

    pub fn note_length(&self) -> usize {
        self.note_length
    }

    pub fn vocoder(&self) -> &PhaseVocoder {
        &self.vocoder
    }

    /// Recompute note lengths for a new beat length.
    pub fn init_note_length(&mut self, samples_per_beat: f64) {
        self.note_length_fractional = samples_per_beat / self.power_of_two as f64;
        self.note_length = self.note_length_fractional.round() as usize;
    }

    /// Set the pitch before processing starts.
    pub fn prepare_phase_vocoder(&mut self, pitch_cents: f32) {
        self.vocoder.prepare(pitch_cents);
    }

    /// Forward a changed pitch to the vocoder; it takes effect after the
    /// next frame.
    #[inline]
    pub fn queue_pitch(&self, pitch: ParamValue) {
        if pitch.changed {
            self.vocoder.queue_params(pitch.value);
        }
    }

    #[inline]
    pub fn update_filters(&mut self, low_pass: ParamValue, high_pass: ParamValue) {
        self.filters.update(low_pass, high_pass);
    }

    #[inline]
    pub fn filter(&mut self, sample: f32) -> f32 {
        self.filters.process(sample)
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset();
    }

    /// Feed one (tapered) input sample.
    #[inline]
    pub fn process_sample(&mut self, sample: f32, ctx: &mut LevelContext<'_>) {
        if let Some(hop) = self.vocoder.process_sample(sample, false) {
            self.add_samples(ctx);
            self.vocoder.load_next_params();
            self.move_write_head_one_hop(hop);
        }
    }

    /// Feed one silent sample without running the transform, moving the
    /// write head as real processing would.
    pub fn skip_sample(&mut self) {
        if let Some(hop) = self.vocoder.process_sample(0.0, true) {
            self.vocoder.load_next_params();
            self.move_write_head_one_hop(hop);
        }
    }

    /// Feed silence until one more hop is produced, flushing the tail of the
    /// current beat. With `skip_processing` only the write head moves.
    pub fn process_final_hop(&mut self, ctx: &mut LevelContext<'_>, skip_processing: bool) {
        for _ in 0..MAX_FLUSH_SAMPLES {
            if let Some(hop) = self.vocoder.process_sample(0.0, skip_processing) {
                if !skip_processing {
                    self.add_samples(ctx);
                }
                self.vocoder.load_next_params();
                self.move_write_head_one_hop(hop);
                return;
            }
        }
        debug_assert!(false, "level {} never produced a final hop", self.level);
    }

    /// Whether note `copy` of the current beat falls in a dropped slot.
    #[inline]
    pub fn should_drop_this_note(&self, copy: usize, beat_b: bool, drops: NoteDrops) -> bool {
        drops.contains(NoteSlot::for_copy(copy, beat_b))
    }

    fn add_samples(&mut self, ctx: &mut LevelContext<'_>) {
        let note_length = ctx.clock.beat_sample_length() as f64 / self.power_of_two as f64;
        let beat_b = ctx.clock.is_beat_b();
        let frame = self.vocoder.synthesis_frame();
        for copy in 0..self.power_of_two {
            if self.should_drop_this_note(copy, beat_b, ctx.drops) {
                continue;
            }
            let offset = (2.0 * note_length * copy as f64) as usize;
            let head = (self.write_position + offset) % self.ring_len;
            ctx.ring.add_frame(self.level, head, frame);
        }
    }

    fn move_write_head_one_hop(&mut self, hop: usize) {
        self.accumulated_this_beat += hop;
        self.write_position = (self.write_position + hop) % self.ring_len;
    }

    /// Land the write head exactly one note after where this beat started.
    pub fn fast_forward_write_heads_to_next_beat(&mut self) {
        let remaining = self.note_length as i64 - self.accumulated_this_beat as i64;
        self.set_write_position(self.write_position as i64 + remaining);
        self.accumulated_this_beat = 0;
    }

    /// After beat B, skip the note slots already filled by this pair's copies.
    pub fn move_write_pos_on_beat_b(&mut self) {
        self.set_write_position(self.write_position as i64 + self.beat_b_jump());
    }

    fn beat_b_jump(&self) -> i64 {
        (self.note_length_fractional * self.notes_to_jump_over as f64).round() as i64
    }

    /// Advance the write head as `beats` silent beats would, `b_beats` of
    /// which were B beats. Assumes the level is at a beat start.
    pub fn skip_beats(&mut self, beats: u64, b_beats: u64) {
        let advance = beats as i128 * self.note_length as i128 + b_beats as i128 * self.beat_b_jump() as i128;
        let advance = (advance % self.ring_len as i128) as i64;
        self.set_write_position(self.write_position as i64 + advance);
        self.accumulated_this_beat = 0;
    }

    pub fn reset_between_beats(&mut self) {
        self.vocoder.reset_between_beats();
    }

    pub fn full_reset(&mut self) {
        self.vocoder.full_reset();
        self.accumulated_this_beat = 0;
    }
}
