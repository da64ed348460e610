//! End-to-end behaviour of the subdivision engine.

use approx::assert_abs_diff_eq;
use gz_dsp::{AudioBuffer, BLOCK_SIZE};
use gz_engine::{
    Engine, EngineConfig, Layer, ParameterId, ParameterReader, SharedParameters,
    TransportPosition, TransportState, FIRST_LEVEL_CHANNEL,
};
use gz_master::render_offline;
use std::f32::consts::TAU;
use std::sync::Arc;

const SAMPLE_RATE: f64 = 44100.0;
const BEAT: usize = 22050;

/// One level, dry muted, every shaping parameter neutral.
fn single_level_params() -> Arc<SharedParameters> {
    let shared = Arc::new(SharedParameters::new());
    shared.set(ParameterId::Mute(Layer::Dry), 1.0);
    shared.set(ParameterId::Gain(Layer::Level(0)), 1.0);
    shared.set(ParameterId::Mute(Layer::Level(0)), 0.0);
    shared.set(ParameterId::Pan(Layer::Level(0)), 0.0);
    shared.set(ParameterId::Pitch(0), 0.0);
    shared.set(ParameterId::Taper(0), 0.0);
    shared.set(ParameterId::LowPass(0), 20000.0);
    shared.set(ParameterId::HighPass(0), 10.0);
    for note in 0..4 {
        shared.set(ParameterId::Drop { level: 0, note }, 0.0);
    }
    shared
}

fn single_level_engine() -> Engine<ParameterReader> {
    let config = EngineConfig {
        sample_rate: SAMPLE_RATE,
        levels: 1,
        bpm: 120.0,
        ..EngineConfig::default()
    };
    Engine::new(config, ParameterReader::new(single_level_params())).unwrap()
}

/// Runs of consecutive 441-sample windows whose RMS exceeds half the peak
/// window RMS, as (start sample, length) pairs.
fn bursts(signal: &[f32]) -> Vec<(usize, usize)> {
    const WINDOW: usize = 441;
    let rms: Vec<f32> = signal
        .chunks(WINDOW)
        .map(|w| (w.iter().map(|s| s * s).sum::<f32>() / w.len() as f32).sqrt())
        .collect();
    let peak = rms.iter().cloned().fold(0.0f32, f32::max);
    let threshold = 0.5 * peak;

    let mut runs = Vec::new();
    let mut start = None;
    for (i, &r) in rms.iter().enumerate() {
        match (r > threshold, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s * WINDOW, (i - s) * WINDOW));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s * WINDOW, (rms.len() - s) * WINDOW));
    }
    runs
}

#[test]
fn one_beat_of_tone_repeats_twice_at_double_speed() {
    let mut engine = single_level_engine();
    let mut input = vec![0.0f32; 4 * BEAT];
    for (n, s) in input.iter_mut().take(BEAT).enumerate() {
        *s = 0.5 * (TAU * 1000.0 * n as f32 / SAMPLE_RATE as f32).sin();
    }

    let out = render_offline(&mut engine, &input);
    let level = out.channel(FIRST_LEVEL_CHANNEL);
    let found = bursts(level);

    assert_eq!(found.len(), 2, "bursts: {found:?}");
    // Each copy lasts half a beat, within 5%.
    let half_beat = BEAT / 2;
    for &(_, len) in &found {
        assert!(
            len.abs_diff(half_beat) <= half_beat / 20,
            "burst length {len}, expected about {half_beat}"
        );
    }
    let spacing = found[1].0 - found[0].0;
    assert!((20000..=24100).contains(&spacing), "spacing {spacing}");

    // Overlap-add seams must not click: no sample-to-sample step may exceed
    // the steepest slope of the tone itself by more than a small margin.
    let tone_slope = 0.5 * TAU * 1000.0 / SAMPLE_RATE as f32;
    for &(start, len) in &found {
        let max_step = level[start..start + len]
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max);
        assert!(
            max_step < 1.2 * tone_slope,
            "step {max_step} in burst at {start}, tone slope {tone_slope}"
        );
    }
}

#[test]
fn level_copies_start_after_two_beats_of_delay() {
    let mut engine = single_level_engine();
    let mut input = vec![0.0f32; 4 * BEAT];
    for (n, s) in input.iter_mut().take(BEAT).enumerate() {
        *s = 0.5 * (TAU * 440.0 * n as f32 / SAMPLE_RATE as f32).sin();
    }

    let out = render_offline(&mut engine, &input);
    let level = out.channel(FIRST_LEVEL_CHANNEL);
    assert!(level[..2 * BEAT].iter().all(|&s| s == 0.0));
    let found = bursts(level);
    assert!(found[0].0 >= 2 * BEAT + BEAT / 2 - 441, "first burst at {}", found[0].0);
}

#[test]
fn jump_matches_fresh_start_at_same_position() {
    let input: Vec<f32> = (0..BLOCK_SIZE)
        .map(|n| (n as f32 * 0.043).sin() * 0.3)
        .collect();
    let config = EngineConfig::default();
    let shared = Arc::new(SharedParameters::new());
    for level in 0..4 {
        shared.set(ParameterId::Mute(Layer::Level(level)), 0.0);
    }
    let mut jumped = Engine::new(config, ParameterReader::new(shared.clone())).unwrap();
    let mut fresh = Engine::new(config, ParameterReader::new(shared)).unwrap();

    let mut out_a = AudioBuffer::new(jumped.output_channels(), BLOCK_SIZE);
    let mut out_b = AudioBuffer::new(fresh.output_channels(), BLOCK_SIZE);

    for b in 0..40 {
        let t = TransportPosition::playing_at((b * BLOCK_SIZE) as i64);
        jumped.process_block(&input, &mut out_a, Some(&t));
    }

    let target = 5 * BEAT as i64 + 1234;
    for b in 0..600 {
        let t = TransportPosition::playing_at(target + (b * BLOCK_SIZE) as i64);
        jumped.process_block(&input, &mut out_a, Some(&t));
        fresh.process_block(&input, &mut out_b, Some(&t));
        for ch in 0..out_a.channels() {
            for (a, b) in out_a.channel(ch).iter().zip(out_b.channel(ch)) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
            }
        }
    }
    assert_eq!(jumped.clock().beat_number(), fresh.clock().beat_number());
    assert_eq!(jumped.ring_read_position(), fresh.ring_read_position());
}

#[test]
fn stop_clears_pending_output() {
    let mut engine = single_level_engine();
    let tone: Vec<f32> = (0..BLOCK_SIZE)
        .map(|n| (n as f32 * 0.1).sin() * 0.5)
        .collect();
    let silence = vec![0.0f32; BLOCK_SIZE];
    let mut out = AudioBuffer::new(engine.output_channels(), BLOCK_SIZE);

    // One beat of tone queues two copies in the ring.
    let mut position = 0i64;
    while position < BEAT as i64 + BLOCK_SIZE as i64 {
        engine.process_block(&tone, &mut out, Some(&TransportPosition::playing_at(position)));
        position += BLOCK_SIZE as i64;
    }

    engine.process_block(&silence, &mut out, Some(&TransportPosition::stopped()));
    assert_eq!(engine.transport_state(), TransportState::Stopped);

    // Restart where playback left off: nothing queued before the stop comes out.
    let mut energy = 0.0f32;
    for _ in 0..(4 * BEAT / BLOCK_SIZE) {
        engine.process_block(&silence, &mut out, Some(&TransportPosition::playing_at(position)));
        energy += out.channel(0).iter().map(|s| s * s).sum::<f32>();
        position += BLOCK_SIZE as i64;
    }
    assert_eq!(energy, 0.0);
}

#[test]
fn dropped_notes_are_silent() {
    let shared = single_level_params();
    // Level 0 writes copy 0 of beat A to the first slot and copy 1 to the third.
    shared.set(ParameterId::Drop { level: 0, note: 2 }, 1.0);
    let config = EngineConfig {
        levels: 1,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config, ParameterReader::new(shared)).unwrap();
    let mut input = vec![0.0f32; 4 * BEAT];
    for (n, s) in input.iter_mut().take(BEAT).enumerate() {
        *s = 0.5 * (TAU * 1000.0 * n as f32 / SAMPLE_RATE as f32).sin();
    }

    let out = render_offline(&mut engine, &input);
    let found = bursts(out.channel(FIRST_LEVEL_CHANNEL));
    assert_eq!(found.len(), 1, "bursts: {found:?}");
}
