//! Real-time subdivision engine for gamelanizer.
//!
//! Each incoming beat is compressed in time by a phase vocoder and written
//! back `2^(level+1)` times into the following beats, so every level plays
//! the input at twice the rate of the one above it.

mod engine;
mod error;
mod filter;
mod frame;
pub mod latency;
mod output_ring;
pub mod params;
mod phase_vocoder;
mod resampler;
mod spectrum;
mod subdivision;
mod transport;

pub use engine::{Engine, EngineConfig, DRY_CHANNEL, FIRST_LEVEL_CHANNEL};
pub use error::EngineError;
pub use filter::{clamp_cutoff, FilterPair};
pub use frame::{pan_gains, Frame};
pub use latency::LatencyStrategy;
pub use output_ring::{DelayLine, SharedOutputRing};
pub use params::{
    Layer, ParamValue, ParameterId, ParameterProvider, ParameterReader, SharedParameters,
};
pub use phase_vocoder::{cents_to_ratio, PhaseVocoder, VocoderState};
pub use resampler::VariableRateResampler;
pub use spectrum::Spectrum;
pub use subdivision::{LevelContext, NoteDrops, NoteSlot, SubdivisionLevel};
pub use transport::{TransportInfo, TransportPosition, TransportState};
