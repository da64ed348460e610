//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Default block size for audio processing.
pub const BLOCK_SIZE: usize = 256;

/// A multichannel f32 audio buffer in planar layout.
///
/// Data is stored as `channels` contiguous planes of `frames` samples each.
/// `data[ch * frames + frame]` gives the sample for channel `ch` at `frame`.
/// Also used as the backing store of long circular buffers, so frame counts
/// are not limited to block sizes.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: usize,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels * frames],
            channels,
            frames,
        }
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.frames;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.frames;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Write one sample if the channel exists.
    #[inline]
    pub fn set(&mut self, ch: usize, frame: usize, value: f32) {
        if ch < self.channels && frame < self.frames {
            self.data[ch * self.frames + frame] = value;
        }
    }

    /// Add `source` into channel `ch` starting at `offset`, wrapping around
    /// the end of the channel.
    pub fn add_wrapping(&mut self, ch: usize, offset: usize, source: &[f32]) {
        debug_assert!(source.len() <= self.frames);
        let plane = self.channel_mut(ch);
        let start = offset % plane.len();
        let first = source.len().min(plane.len() - start);
        for (dst, &src) in plane[start..start + first].iter_mut().zip(source) {
            *dst += src;
        }
        for (dst, &src) in plane.iter_mut().zip(&source[first..]) {
            *dst += src;
        }
    }

    /// Interleave the first `channels` planes into `out`.
    pub fn interleave(&self, channels: usize, out: &mut Vec<f32>) {
        let channels = channels.min(self.channels);
        out.reserve(self.frames * channels);
        for frame in 0..self.frames {
            for ch in 0..channels {
                out.push(self.data[ch * self.frames + frame]);
            }
        }
    }

    /// Scale all samples by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        for s in &mut self.data {
            *s *= gain;
        }
    }
}
