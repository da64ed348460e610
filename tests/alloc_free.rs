//! Allocation-free render path tests.
//!
//! These tests verify that `Engine::process_block()` does not allocate once
//! the engine is built. They run several seconds of material through every
//! level, including beat boundaries, pitch and filter changes from a control
//! thread, transport jumps and stops.
//!
//! Just run `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use gz_dsp::{AudioBuffer, BLOCK_SIZE};
use gz_engine::{
    Engine, EngineConfig, Layer, LatencyStrategy, ParameterId, ParameterReader, SharedParameters,
    TransportPosition,
};
use std::sync::Arc;

fn build(config: EngineConfig) -> (Engine<ParameterReader>, Arc<SharedParameters>) {
    let shared = Arc::new(SharedParameters::new());
    for level in 0..config.levels {
        shared.set(ParameterId::Mute(Layer::Level(level)), 0.0);
    }
    let engine = Engine::new(config, ParameterReader::new(shared.clone())).unwrap();
    (engine, shared)
}

fn input_block(offset: usize) -> Vec<f32> {
    (0..BLOCK_SIZE)
        .map(|n| ((offset + n) as f32 * 0.031).sin() * 0.4)
        .collect()
}

/// Render `blocks` contiguous blocks, aborting on any heap allocation.
fn assert_render_alloc_free(config: EngineConfig, blocks: usize) {
    let (mut engine, _) = build(config);
    let input = input_block(0);
    let mut output = AudioBuffer::new(engine.output_channels(), BLOCK_SIZE);

    assert_no_alloc(|| {
        for b in 0..blocks {
            let t = TransportPosition::playing_at((b * BLOCK_SIZE) as i64);
            engine.process_block(&input, &mut output, Some(&t));
        }
    });
}

#[test]
fn four_levels_alloc_free() {
    assert_render_alloc_free(EngineConfig::default(), 44100 * 5 / BLOCK_SIZE);
}

#[test]
fn fast_tempo_alloc_free() {
    let config = EngineConfig {
        bpm: 1000.0,
        latency: LatencyStrategy::EarliestABeforeC,
        ..EngineConfig::default()
    };
    assert_render_alloc_free(config, 44100 * 5 / BLOCK_SIZE);
}

#[test]
fn parameter_changes_alloc_free() {
    let (mut engine, shared) = build(EngineConfig {
        bpm: 240.0,
        ..EngineConfig::default()
    });
    let input = input_block(7);
    let mut output = AudioBuffer::new(engine.output_channels(), BLOCK_SIZE);

    for b in 0..600 {
        // Control-thread writes happen outside the checked scope.
        shared.set(ParameterId::Pitch(b % 4), (b as f32 * 37.0) % 2400.0 - 1200.0);
        shared.set(ParameterId::LowPass(b % 4), 500.0 + (b * 13 % 9000) as f32);
        shared.set(ParameterId::Drop { level: b % 4, note: b % 4 }, (b % 2) as f32);
        assert_no_alloc(|| {
            let t = TransportPosition::playing_at((b * BLOCK_SIZE) as i64);
            engine.process_block(&input, &mut output, Some(&t));
        });
    }
}

#[test]
fn jumps_and_stops_alloc_free() {
    let (mut engine, _) = build(EngineConfig::default());
    let input = input_block(3);
    let mut output = AudioBuffer::new(engine.output_channels(), BLOCK_SIZE);

    assert_no_alloc(|| {
        let mut position = 0i64;
        for b in 0..400 {
            if b % 50 == 25 {
                position += 100_003;
            }
            let t = if b % 90 == 89 {
                TransportPosition::stopped()
            } else {
                TransportPosition::playing_at(position)
            };
            engine.process_block(&input, &mut output, Some(&t));
            position += BLOCK_SIZE as i64;
        }
    });
}

#[test]
fn standalone_alloc_free() {
    let (mut engine, _) = build(EngineConfig {
        levels: 2,
        ..EngineConfig::default()
    });
    let input = input_block(0);
    let mut output = AudioBuffer::new(2, BLOCK_SIZE);

    assert_no_alloc(|| {
        for _ in 0..44100 * 3 / BLOCK_SIZE {
            engine.process_block(&input, &mut output, None);
        }
    });
}
