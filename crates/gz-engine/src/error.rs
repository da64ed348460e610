//! Engine error type.
//!
//! Only construction and control calls can fail. The audio path never
//! returns errors; it clamps and asserts instead.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("level count must be between 1 and {max}, got {requested}")]
    InvalidLevelCount { requested: usize, max: usize },

    #[error("tempo cannot change while the transport is playing")]
    TempoLocked,

    #[error("spectrum has {actual} bins, expected {expected}")]
    SpectrumSize { expected: usize, actual: usize },

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
}
