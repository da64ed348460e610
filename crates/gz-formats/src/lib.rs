//! File formats for gamelanizer.
//!
//! Reads WAV input as mono, writes multichannel float WAV output and
//! (de)serializes the session state document.

mod error;
mod state;
mod wav;

pub use error::FormatError;
pub use state::SessionState;
pub use wav::{load_wav, read_wav, render_to_wav_bytes, write_wav, MonoAudio};
