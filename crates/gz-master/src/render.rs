//! Offline rendering of a whole input signal.

use gz_dsp::{AudioBuffer, BLOCK_SIZE};
use gz_engine::{Engine, ParameterProvider, TransportPosition};

/// Samples rendered after the input ends so the last beat's copies and the
/// delayed dry signal come out in full.
pub fn tail_samples<P: ParameterProvider>(engine: &Engine<P>) -> usize {
    engine.latency_samples() + (2.0 * engine.clock().samples_per_beat()).ceil() as usize
}

/// Run `input` through `engine` block by block from timeline position 0.
///
/// Returns every output channel, `input.len()` plus [`tail_samples`] long.
pub fn render_offline<P: ParameterProvider>(engine: &mut Engine<P>, input: &[f32]) -> AudioBuffer {
    let total = input.len() + tail_samples(engine);
    let channels = engine.output_channels();
    let mut rendered = AudioBuffer::new(channels, total);
    let mut block_in = [0.0f32; BLOCK_SIZE];
    let mut block_out = AudioBuffer::new(channels, BLOCK_SIZE);

    let mut start = 0;
    while start < total {
        let n = BLOCK_SIZE.min(total - start);
        block_in.fill(0.0);
        if start < input.len() {
            let m = n.min(input.len() - start);
            block_in[..m].copy_from_slice(&input[start..start + m]);
        }

        let transport = TransportPosition::playing_at(start as i64);
        engine.process_block(&block_in[..n], &mut block_out, Some(&transport));
        for ch in 0..channels {
            rendered.channel_mut(ch)[start..start + n].copy_from_slice(&block_out.channel(ch)[..n]);
        }
        start += n;
    }
    rendered
}
