use thiserror::Error;

/// Error type for reading and writing files.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("WAV file has no channels")]
    NoChannels,
    #[error("state document: {0}")]
    State(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
