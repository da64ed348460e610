//! DSP primitives for the gamelanizer subdivision engine.
//!
//! Everything here is a leaf: modular arithmetic, accumulated rounding,
//! window functions, the beat clock, the Catmull-Rom interpolator and the
//! planar audio buffer. Nothing in this crate allocates after construction.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod beat_clock;
pub mod constants;
mod interpolator;
pub mod modulo;
mod rounded;
pub mod window;

pub use audio_buffer::{AudioBuffer, BLOCK_SIZE};
pub use beat_clock::BeatClock;
pub use interpolator::CatmullRomInterpolator;
pub use modulo::{mod_float, mod_int, wrap_phase};
pub use rounded::{RoundedAccumulator, RoundingStrategy};
pub use window::{fill_hann, tukey};
