//! Audio device traits and error types.

use thiserror::Error;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no {0} device available")]
    NoDevice(&'static str),
}

/// A device that plays stereo frames.
///
/// Frames are queued through the backend's own writer, e.g.
/// `CpalOutput::write_spin`.
pub trait AudioOutput {
    fn sample_rate(&self) -> u32;

    fn start(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;
}

/// A device that captures mono samples.
pub trait AudioInput {
    fn sample_rate(&self) -> u32;

    /// Move up to `out.len()` captured samples into `out`; returns the count.
    fn read(&mut self, out: &mut [f32]) -> usize;

    fn start(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;
}
