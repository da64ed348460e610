//! CPAL-based audio backends.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use gz_engine::Frame;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioInput, AudioOutput};

/// Queue length in frames: about 100ms.
fn queue_len(sample_rate: u32) -> usize {
    (sample_rate as usize / 10).max(1024)
}

/// CPAL output on the default device.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    producer: HeapProd<Frame>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device in stereo. The returned consumer is
    /// handed to [`Self::build_stream`].
    pub fn new() -> Result<(Self, HeapCons<Frame>), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice("output"))?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // The callback writes two interleaved channels.
        config.channels = 2;

        let rb = HeapRb::<Frame>::new(queue_len(config.sample_rate.0));
        let (producer, consumer) = rb.split();
        log::info!(
            "output device {:?} at {} Hz",
            device.name().unwrap_or_default(),
            config.sample_rate.0
        );

        let output = Self {
            device,
            config,
            stream: None,
            producer,
            running: Arc::new(AtomicBool::new(false)),
        };

        Ok((output, consumer))
    }

    /// Build the output stream. It plays silence until [`AudioOutput::start`].
    pub fn build_stream(&mut self, mut consumer: HeapCons<Frame>) -> Result<(), AudioError> {
        let running = self.running.clone();
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    for chunk in data.chunks_mut(channels) {
                        let frame = consumer.try_pop().unwrap_or_default();
                        for (i, sample) in chunk.iter_mut().enumerate() {
                            *sample = match i {
                                0 => frame.left,
                                1 => frame.right,
                                _ => 0.0,
                            };
                        }
                    }
                },
                |err| log::error!("output stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }

    /// Write a single frame, spinning until the queue has room.
    pub fn write_spin(&mut self, frame: Frame) {
        while self.producer.try_push(frame).is_err() {
            std::hint::spin_loop();
        }
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}

/// CPAL capture on the default input device, mixed down to mono.
pub struct CpalInput {
    config: StreamConfig,
    stream: Stream,
    consumer: HeapCons<f32>,
    running: Arc<AtomicBool>,
}

impl CpalInput {
    /// Open the default input device at `sample_rate` so that it runs in
    /// step with the output device.
    pub fn new(sample_rate: u32) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoDevice("input"))?;

        let default = device
            .default_input_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let mut config: StreamConfig = default.into();
        config.sample_rate = SampleRate(sample_rate);
        let channels = config.channels.max(1) as usize;

        let rb = HeapRb::<f32>::new(queue_len(sample_rate) * 2);
        let (mut producer, consumer): (HeapProd<f32>, HeapCons<f32>) = rb.split();
        let running = Arc::new(AtomicBool::new(false));
        let capturing = running.clone();
        let scale = 1.0 / channels as f32;

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !capturing.load(Ordering::Relaxed) {
                        return;
                    }
                    for chunk in data.chunks(channels) {
                        // Overruns drop the newest samples.
                        let _ = producer.try_push(chunk.iter().sum::<f32>() * scale);
                    }
                },
                |err| log::error!("input stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;
        log::info!(
            "input device {:?}, {} channel(s) at {} Hz",
            device.name().unwrap_or_default(),
            channels,
            sample_rate
        );

        Ok(Self {
            config,
            stream,
            consumer,
            running,
        })
    }
}

impl AudioInput for CpalInput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn read(&mut self, out: &mut [f32]) -> usize {
        self.consumer.pop_slice(out)
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        self.stream
            .play()
            .map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        self.stream
            .pause()
            .map_err(|e| AudioError::Playback(e.to_string()))
    }
}
