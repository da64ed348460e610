//! Live audio backends for gamelanizer.
//!
//! The default input device feeds a lock-free queue of mono samples; the
//! default output device drains a queue of stereo frames.

mod cpal_backend;
mod traits;

pub use cpal_backend::{CpalInput, CpalOutput};
pub use traits::{AudioError, AudioInput, AudioOutput};
