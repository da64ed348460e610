//! Host transport as seen by the engine.

/// Playback state reported by a host, polled once per block.
pub trait TransportInfo {
    fn is_playing(&self) -> bool;
    /// Timeline position of the block's first sample.
    fn time_in_samples(&self) -> i64;
}

/// A transport snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportPosition {
    pub playing: bool,
    pub time_in_samples: i64,
}

impl TransportPosition {
    pub const fn playing_at(time_in_samples: i64) -> Self {
        Self {
            playing: true,
            time_in_samples,
        }
    }

    pub const fn stopped() -> Self {
        Self {
            playing: false,
            time_in_samples: 0,
        }
    }
}

impl TransportInfo for TransportPosition {
    fn is_playing(&self) -> bool {
        self.playing
    }

    fn time_in_samples(&self) -> i64 {
        self.time_in_samples
    }
}

/// Whether the engine is rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}
