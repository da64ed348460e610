//! The subdivision engine.
//!
//! Owns the beat clock, the dry delay line, the shared output ring and one
//! [`SubdivisionLevel`] per active level, and drives them one sample at a
//! time. The dry signal is delayed by the reported latency; each level's
//! compressed notes are written ahead of the shared read cursor so that they
//! come out aligned with that delayed signal.

use arrayvec::ArrayVec;
use gz_dsp::constants::{max_samples_per_beat, samples_per_beat, MAX_BPM, MAX_LEVELS, MIN_BPM};
use gz_dsp::{tukey, AudioBuffer, BeatClock};

use crate::error::EngineError;
use crate::frame::Frame;
use crate::latency::{note_lengths, LatencyStrategy};
use crate::output_ring::{DelayLine, SharedOutputRing};
use crate::params::{Layer, ParameterProvider, NOTES_PER_PAIR};
use crate::subdivision::{LevelContext, NoteDrops, SubdivisionLevel};
use crate::transport::{TransportInfo, TransportState};

/// Output channel carrying the delayed dry signal on its own.
pub const DRY_CHANNEL: usize = 2;

/// Output channel of level 0; level `n` is on `FIRST_LEVEL_CHANNEL + n`.
pub const FIRST_LEVEL_CHANNEL: usize = 3;

/// Construction settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Number of active subdivision levels, 1 to [`MAX_LEVELS`].
    pub levels: usize,
    pub bpm: f32,
    pub latency: LatencyStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            levels: MAX_LEVELS,
            bpm: 120.0,
            latency: LatencyStrategy::default(),
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(self.sample_rate));
        }
        if self.levels == 0 || self.levels > MAX_LEVELS {
            return Err(EngineError::InvalidLevelCount {
                requested: self.levels,
                max: MAX_LEVELS,
            });
        }
        Ok(())
    }

    /// Channels needed to receive every individual output.
    pub fn output_channels(&self) -> usize {
        FIRST_LEVEL_CHANNEL + self.levels
    }
}

pub struct Engine<P: ParameterProvider> {
    sample_rate: f64,
    bpm: f32,
    samples_per_beat: f64,
    latency: LatencyStrategy,
    latency_samples: usize,

    clock: BeatClock,
    levels: ArrayVec<SubdivisionLevel, MAX_LEVELS>,
    ring: SharedOutputRing,
    delay: DelayLine,
    params: P,

    state: TransportState,
    expected_position: i64,
}

impl<P: ParameterProvider> Engine<P> {
    /// Allocate every buffer for `config`. Nothing allocates afterwards.
    pub fn new(config: EngineConfig, mut params: P) -> Result<Self, EngineError> {
        config.validate()?;

        let max_spb = max_samples_per_beat(config.sample_rate);
        let ring_len = 4 * max_spb;
        let mut levels = ArrayVec::new();
        for index in 0..config.levels {
            let mut level = SubdivisionLevel::new(
                index,
                config.sample_rate as f32,
                ring_len,
                params.low_pass_cutoff(index).value,
                params.high_pass_cutoff(index).value,
            )?;
            level.prepare_phase_vocoder(params.pitch(index, false).value);
            levels.push(level);
        }

        let bpm = config.bpm.clamp(MIN_BPM, MAX_BPM);
        let spb = samples_per_beat(config.sample_rate, bpm);
        let mut engine = Self {
            sample_rate: config.sample_rate,
            bpm,
            samples_per_beat: spb,
            latency: config.latency,
            latency_samples: 0,
            clock: BeatClock::new(spb),
            levels,
            ring: SharedOutputRing::new(config.levels, ring_len),
            delay: DelayLine::new(3 * max_spb + 1),
            params,
            state: TransportState::Stopped,
            expected_position: 0,
        };
        engine.update_latency();

        log::info!(
            "engine ready: {} Hz, {} levels, {:.1} bpm, latency {} samples ({:?})",
            config.sample_rate,
            config.levels,
            bpm,
            engine.latency_samples,
            config.latency
        );
        log::debug!("output ring {} samples, delay line {} samples", ring_len, engine.delay.len());
        Ok(engine)
    }

    fn update_latency(&mut self) {
        let notes = note_lengths(self.samples_per_beat, self.levels.len());
        self.latency_samples = self.latency.latency_samples(self.samples_per_beat, &notes);
    }

    /// Change tempo. Only allowed while stopped; the next start re-aligns
    /// everything to the new grid.
    pub fn set_tempo(&mut self, bpm: f32) -> Result<(), EngineError> {
        if self.state == TransportState::Playing {
            return Err(EngineError::TempoLocked);
        }
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.samples_per_beat = samples_per_beat(self.sample_rate, self.bpm);
        self.clock.reset(self.samples_per_beat);
        self.update_latency();
        log::info!("tempo {:.2} bpm, latency {} samples", self.bpm, self.latency_samples);
        Ok(())
    }

    pub fn tempo(&self) -> f32 {
        self.bpm
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Delay applied to the dry signal, as reported to a host.
    pub fn latency_samples(&self) -> usize {
        self.latency_samples
    }

    pub fn transport_state(&self) -> TransportState {
        self.state
    }

    /// Timeline position the next block is expected to start at.
    pub fn expected_position(&self) -> i64 {
        self.expected_position
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    pub fn levels(&self) -> &[SubdivisionLevel] {
        &self.levels
    }

    pub fn ring_read_position(&self) -> usize {
        self.ring.read_position()
    }

    /// Channels needed to receive every individual output.
    pub fn output_channels(&self) -> usize {
        FIRST_LEVEL_CHANNEL + self.levels.len()
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut P {
        &mut self.params
    }

    /// Render one block.
    ///
    /// `output` needs at least two channels (the stereo mix); channel 2 and
    /// up receive the individual layers when present. With no transport the
    /// engine free-runs from its own position.
    pub fn process_block(
        &mut self,
        input: &[f32],
        output: &mut AudioBuffer,
        transport: Option<&dyn TransportInfo>,
    ) {
        debug_assert!(output.channels() >= 2);
        output.silence();

        match transport {
            Some(t) if !t.is_playing() => {
                if self.state == TransportState::Playing {
                    self.stop();
                }
                return;
            }
            Some(t) => {
                let position = t.time_in_samples();
                if self.state == TransportState::Stopped || position != self.expected_position {
                    self.resync(position);
                }
            }
            None => {
                if self.state == TransportState::Stopped {
                    self.resync(self.expected_position);
                }
            }
        }
        self.state = TransportState::Playing;

        let frames = input.len().min(output.frames());
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render(&input[..frames], output));
        #[cfg(not(feature = "alloc_check"))]
        self.render(&input[..frames], output);
    }

    /// Stop and clear every buffer.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.ring.clear();
        self.delay.clear();
    }

    fn render(&mut self, input: &[f32], output: &mut AudioBuffer) {
        for (frame, &sample) in input.iter().enumerate() {
            self.process_sample(sample, output, frame);
        }
    }

    #[inline]
    fn process_sample(&mut self, input: f32, output: &mut AudioBuffer, frame: usize) {
        self.delay.write(input);
        let dry = self.delay.read()
            * self.params.gain(Layer::Dry)
            * (1.0 - self.params.mute(Layer::Dry));
        let mut mix = Frame::panned(dry, self.params.pan(Layer::Dry));
        output.set(DRY_CHANNEL, frame, dry);

        let samples_into_beat = self.clock.samples_into_beat() as f64;
        let beat_length = self.clock.beat_sample_length() as f64;

        for level in self.levels.iter_mut() {
            let index = level.level();
            let layer = Layer::Level(index);

            let gain = self.params.gain(layer) * (1.0 - self.params.mute(layer));
            let wet = self.ring.read_and_erase(index) * gain;
            level.update_filters(
                self.params.low_pass_cutoff(index),
                self.params.high_pass_cutoff(index),
            );
            let wet = level.filter(wet);
            mix.mix(Frame::panned(wet, self.params.pan(layer)));
            output.set(FIRST_LEVEL_CHANNEL + index, frame, wet);

            level.queue_pitch(self.params.pitch(index, true));
            let taper = tukey(samples_into_beat, beat_length, self.params.taper(index) as f64);
            let drops = NoteDrops(std::array::from_fn(|note| self.params.drop_note(index, note)));
            let mut ctx = LevelContext {
                clock: &self.clock,
                ring: &mut self.ring,
                drops,
            };
            level.process_sample(input * taper as f32, &mut ctx);
        }

        output.set(0, frame, mix.left);
        output.set(1, frame, mix.right);

        self.clock.advance_one_sample();
        if self.clock.is_at_beat_boundary() {
            self.next_beat(false);
        }
        self.ring.advance_read();
        self.delay.advance();
        self.expected_position += 1;
    }

    /// Close the current beat on every level and move the clock on. With
    /// `skip_processing` the final hop moves the write heads but writes
    /// nothing.
    fn next_beat(&mut self, skip_processing: bool) {
        let beat_b = self.clock.is_beat_b();
        for level in self.levels.iter_mut() {
            let index = level.level();
            let drops: [bool; NOTES_PER_PAIR] =
                std::array::from_fn(|note| self.params.drop_note(index, note));
            let mut ctx = LevelContext {
                clock: &self.clock,
                ring: &mut self.ring,
                drops: NoteDrops(drops),
            };
            level.process_final_hop(&mut ctx, skip_processing);
            level.fast_forward_write_heads_to_next_beat();
            level.reset_between_beats();
            if beat_b {
                level.move_write_pos_on_beat_b();
            }
        }
        self.clock.next_beat();
    }

    /// Cold start at `position`: clear everything, re-derive every cursor
    /// from the beat grid, then advance silently to `position`.
    fn resync(&mut self, position: i64) {
        self.ring.clear();
        self.delay.clear();
        self.clock.reset(self.samples_per_beat);

        let notes = note_lengths(self.samples_per_beat, self.levels.len());
        let writes = self.latency.initial_write_positions(self.samples_per_beat, &notes);
        for (level, &write) in self.levels.iter_mut().zip(&writes) {
            level.init_note_length(self.samples_per_beat);
            level.set_write_position(write);
            level.full_reset();
            level.reset_filters();
        }
        self.latency_samples = self.latency.latency_samples(self.samples_per_beat, &notes);
        self.ring.set_read_position(0);
        self.delay.set_delay(self.latency_samples);
        self.expected_position = 0;

        self.simulate_processing(position.max(0) as u64);
    }

    /// Advance the beat grid and every cursor by `samples` as if silence had
    /// been processed from a cold start. All but the last whole beat are
    /// skipped in closed form: each one moves a level's write head by exactly
    /// one note, plus the beat-B jump. The last whole beat and the rest of
    /// the current one are walked sample by sample without running any
    /// transform, so every vocoder enters the current beat with the same
    /// queued input real processing would leave behind.
    fn simulate_processing(&mut self, samples: u64) {
        if samples == 0 {
            return;
        }
        let target = samples as i64;
        let spb = self.samples_per_beat;
        let beat_end = |n: u64| (spb * n as f64).round() as i64;

        let mut beats = (target as f64 / spb).floor() as u64;
        while beat_end(beats + 1) <= target {
            beats += 1;
        }
        while beats > 0 && beat_end(beats) > target {
            beats -= 1;
        }
        let closed_form = beats.saturating_sub(1);

        // Beat 1 is an A beat, so B beats are every second one.
        for level in self.levels.iter_mut() {
            level.skip_beats(closed_form, closed_form / 2);
        }
        self.clock.skip_beats(closed_form);

        let skipped = self.clock.beat_sample_start() as u64;
        let ring_len = self.ring.len() as u64;
        self.ring.set_read_position((skipped % ring_len) as usize);
        self.delay.skip(skipped);

        for _ in skipped as i64..target {
            for level in self.levels.iter_mut() {
                level.skip_sample();
            }
            self.clock.advance_one_sample();
            if self.clock.is_at_beat_boundary() {
                self.next_beat(true);
            }
            self.ring.advance_read();
            self.delay.advance();
        }
        self.expected_position = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParameterId, ParameterReader, SharedParameters};
    use crate::transport::TransportPosition;
    use std::sync::Arc;

    fn engine(levels: usize) -> Engine<ParameterReader> {
        let shared = Arc::new(SharedParameters::new());
        let config = EngineConfig {
            levels,
            ..EngineConfig::default()
        };
        Engine::new(config, ParameterReader::new(shared)).unwrap()
    }

    fn run(engine: &mut Engine<ParameterReader>, start: i64, blocks: usize) {
        let input = vec![0.1f32; 256];
        let mut output = AudioBuffer::new(engine.output_channels(), 256);
        for b in 0..blocks {
            let t = TransportPosition::playing_at(start + (b * 256) as i64);
            engine.process_block(&input, &mut output, Some(&t));
        }
    }

    #[test]
    fn rejects_bad_config() {
        let shared = Arc::new(SharedParameters::new());
        let bad_levels = EngineConfig {
            levels: 5,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(bad_levels, ParameterReader::new(shared.clone())),
            Err(EngineError::InvalidLevelCount { requested: 5, .. })
        ));
        let bad_rate = EngineConfig {
            sample_rate: 0.0,
            ..EngineConfig::default()
        };
        assert!(Engine::new(bad_rate, ParameterReader::new(shared)).is_err());
    }

    #[test]
    fn tempo_is_clamped_and_locked_while_playing() {
        let mut e = engine(1);
        e.set_tempo(5000.0).unwrap();
        assert_eq!(e.tempo(), MAX_BPM);
        e.set_tempo(1.0).unwrap();
        assert_eq!(e.tempo(), MIN_BPM);

        run(&mut e, 0, 1);
        assert_eq!(e.set_tempo(90.0), Err(EngineError::TempoLocked));
    }

    #[test]
    fn expected_position_follows_contiguous_blocks() {
        let mut e = engine(2);
        run(&mut e, 0, 10);
        assert_eq!(e.expected_position(), 2560);
        assert_eq!(e.ring_read_position(), 2560);
        assert_eq!(e.clock().samples_into_beat(), 2560);
    }

    #[test]
    fn beat_boundaries_follow_the_grid() {
        let mut e = engine(1);
        run(&mut e, 0, 200);
        // 51200 samples at 22050 per beat: two whole beats done.
        assert_eq!(e.clock().beat_number(), 3);
        assert_eq!(e.clock().samples_into_beat(), 51200 - 44100);
        assert!(!e.clock().is_beat_b());
    }

    #[test]
    fn jump_resyncs_to_new_position() {
        let mut e = engine(2);
        run(&mut e, 0, 4);
        run(&mut e, 100_000, 1);
        assert_eq!(e.expected_position(), 100_256);
        // 100000 = 4 beats of 22050 plus 11800.
        assert_eq!(e.clock().beat_number(), 5);
        assert_eq!(e.clock().samples_into_beat(), 11800 + 256);
    }

    /// Process `samples` of silence from position 0 in 256-sample blocks.
    fn run_silence(engine: &mut Engine<ParameterReader>, samples: usize) {
        let input = vec![0.0f32; 256];
        let mut output = AudioBuffer::new(engine.output_channels(), 256);
        let mut position = 0;
        while position < samples {
            let n = (samples - position).min(256);
            let t = TransportPosition::playing_at(position as i64);
            engine.process_block(&input[..n], &mut output, Some(&t));
            position += n;
        }
    }

    fn assert_same_cursors(a: &Engine<ParameterReader>, b: &Engine<ParameterReader>) {
        assert_eq!(a.expected_position(), b.expected_position());
        assert_eq!(a.ring_read_position(), b.ring_read_position());
        assert_eq!(a.clock().beat_number(), b.clock().beat_number());
        assert_eq!(a.clock().samples_into_beat(), b.clock().samples_into_beat());
        assert_eq!(a.clock().is_beat_b(), b.clock().is_beat_b());
        for (la, lb) in a.levels().iter().zip(b.levels()) {
            assert_eq!(
                la.write_position(),
                lb.write_position(),
                "level {} write head",
                la.level()
            );
        }
    }

    #[test]
    fn simulated_start_matches_processing_silence() {
        for (bpm, target) in [(120.0, 51_200), (120.0, 100_003), (97.0, 3 * 27_278 + 1_234)] {
            let config = EngineConfig {
                bpm,
                ..EngineConfig::default()
            };
            let mut stepped =
                Engine::new(config, ParameterReader::new(Arc::new(SharedParameters::new()))).unwrap();
            let mut simulated =
                Engine::new(config, ParameterReader::new(Arc::new(SharedParameters::new()))).unwrap();

            run_silence(&mut stepped, target);

            let mut output = AudioBuffer::new(simulated.output_channels(), 256);
            let t = TransportPosition::playing_at(target as i64);
            simulated.process_block(&[], &mut output, Some(&t));

            assert_same_cursors(&stepped, &simulated);
        }
    }

    #[test]
    fn stopping_silences_and_clears() {
        let mut e = engine(1);
        run(&mut e, 0, 4);
        let input = vec![0.5f32; 64];
        let mut output = AudioBuffer::new(4, 64);
        output.channel_mut(0).fill(1.0);
        let stopped = TransportPosition::stopped();
        e.process_block(&input, &mut output, Some(&stopped));
        assert_eq!(e.transport_state(), TransportState::Stopped);
        assert!(output.channel(0).iter().all(|&s| s == 0.0));
        assert!(e.set_tempo(100.0).is_ok());
    }

    #[test]
    fn dry_signal_is_delayed_by_latency() {
        let shared = Arc::new(SharedParameters::new());
        for level in 0..MAX_LEVELS {
            shared.set(ParameterId::Mute(Layer::Level(level)), 1.0);
        }
        let config = EngineConfig {
            bpm: 1000.0,
            ..EngineConfig::default()
        };
        let mut e = Engine::new(config, ParameterReader::new(shared)).unwrap();
        let latency = e.latency_samples();

        let total = latency + 512;
        let mut input = vec![0.0f32; total];
        input[0] = 1.0;
        let mut output = AudioBuffer::new(e.output_channels(), total);
        e.process_block(&input, &mut output, None);

        let dry = output.channel(DRY_CHANNEL);
        assert_eq!(dry[latency], 1.0);
        assert_eq!(dry.iter().filter(|&&s| s != 0.0).count(), 1);
    }

    #[test]
    fn free_running_without_transport() {
        let mut e = engine(1);
        let input = vec![0.0f32; 128];
        let mut output = AudioBuffer::new(2, 128);
        e.process_block(&input, &mut output, None);
        e.process_block(&input, &mut output, None);
        assert_eq!(e.transport_state(), TransportState::Playing);
        assert_eq!(e.expected_position(), 256);
    }
}
