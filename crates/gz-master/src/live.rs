//! Live duplex playback on a dedicated thread.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use gz_audio::{AudioInput, AudioOutput, CpalInput, CpalOutput};
use gz_dsp::{AudioBuffer, BLOCK_SIZE};
use gz_engine::{Engine, EngineConfig, Frame, LatencyStrategy, ParameterReader, SharedParameters};

use crate::ControllerError;

pub(crate) struct PlaybackHandle {
    pub stop_signal: Arc<AtomicBool>,
    pub position: Arc<AtomicI64>,
    pub finished: Arc<AtomicBool>,
    pub thread: Option<JoinHandle<()>>,
}

/// Engine settings captured when playback starts.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LiveSettings {
    pub levels: usize,
    pub bpm: f32,
    pub latency: LatencyStrategy,
}

pub(crate) fn spawn(params: Arc<SharedParameters>, settings: LiveSettings) -> PlaybackHandle {
    let stop_signal = Arc::new(AtomicBool::new(false));
    let position = Arc::new(AtomicI64::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stop = stop_signal.clone();
    let pos = position.clone();
    let done = finished.clone();

    let thread = std::thread::spawn(move || {
        if let Err(e) = audio_thread(params, settings, &stop, &pos) {
            log::error!("live playback failed: {e}");
        }
        done.store(true, Ordering::Relaxed);
    });

    PlaybackHandle {
        stop_signal,
        position,
        finished,
        thread: Some(thread),
    }
}

fn audio_thread(
    params: Arc<SharedParameters>,
    settings: LiveSettings,
    stop_signal: &AtomicBool,
    position: &AtomicI64,
) -> Result<(), ControllerError> {
    let (mut output, consumer) = CpalOutput::new()?;
    let sample_rate = output.sample_rate();
    let mut input = CpalInput::new(sample_rate)?;

    let config = EngineConfig {
        sample_rate: sample_rate as f64,
        levels: settings.levels,
        bpm: settings.bpm,
        latency: settings.latency,
    };
    let mut engine = Engine::new(config, ParameterReader::new(params))?;

    output.build_stream(consumer)?;
    output.start()?;
    input.start()?;
    log::info!("live playback started, latency {} samples", engine.latency_samples());

    let mut block_in = [0.0f32; BLOCK_SIZE];
    let mut block_out = AudioBuffer::new(2, BLOCK_SIZE);

    while !stop_signal.load(Ordering::Relaxed) {
        let n = input.read(&mut block_in);
        if n == 0 {
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }

        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| engine.process_block(&block_in[..n], &mut block_out, None));
        #[cfg(not(feature = "alloc_check"))]
        engine.process_block(&block_in[..n], &mut block_out, None);

        let (left, right) = (block_out.channel(0), block_out.channel(1));
        for i in 0..n {
            output.write_spin(Frame {
                left: left[i],
                right: right[i],
            });
        }
        position.store(engine.expected_position(), Ordering::Relaxed);
    }

    input.stop()?;
    for _ in 0..BLOCK_SIZE {
        output.write_spin(Frame::silence());
    }
    output.stop()?;
    log::info!("live playback stopped");
    Ok(())
}
