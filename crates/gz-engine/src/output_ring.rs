//! The shared output ring and the dry delay line.

use gz_dsp::modulo::wrap_index;
use gz_dsp::AudioBuffer;

/// One circular channel per level, read by a single shared cursor.
///
/// Levels overlap-add ahead of the cursor; the cursor reads and clears one
/// sample per channel per output sample.
pub struct SharedOutputRing {
    buffer: AudioBuffer,
    read_position: usize,
}

impl SharedOutputRing {
    pub fn new(levels: usize, len: usize) -> Self {
        Self {
            buffer: AudioBuffer::new(levels, len),
            read_position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.frames()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.frames() == 0
    }

    pub fn read_position(&self) -> usize {
        self.read_position
    }

    pub fn set_read_position(&mut self, position: usize) {
        self.read_position = position % self.len();
    }

    /// Add `frame` into `level`'s channel at `write_position`, wrapping.
    #[inline]
    pub fn add_frame(&mut self, level: usize, write_position: usize, frame: &[f32]) {
        debug_assert!(
            self.distance_ahead(write_position) + frame.len() <= self.len(),
            "write head would overrun the read cursor"
        );
        self.buffer.add_wrapping(level, write_position, frame);
    }

    /// Take the sample under the read cursor and leave zero in its place.
    #[inline]
    pub fn read_and_erase(&mut self, level: usize) -> f32 {
        let slot = &mut self.buffer.channel_mut(level)[self.read_position];
        std::mem::take(slot)
    }

    #[inline]
    pub fn advance_read(&mut self) {
        self.read_position += 1;
        if self.read_position == self.len() {
            self.read_position = 0;
        }
    }

    /// How far `position` lies ahead of the read cursor.
    pub fn distance_ahead(&self, position: usize) -> usize {
        wrap_index(position as i64 - self.read_position as i64, self.len())
    }

    pub fn clear(&mut self) {
        self.buffer.silence();
    }

    pub fn channel(&self, level: usize) -> &[f32] {
        self.buffer.channel(level)
    }
}

/// Fixed-length delay for the dry signal.
pub struct DelayLine {
    data: Vec<f32>,
    write_position: usize,
    read_position: usize,
}

impl DelayLine {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
            write_position: 0,
            read_position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Restart with the write cursor at 0, reading `delay` samples behind.
    pub fn set_delay(&mut self, delay: usize) {
        debug_assert!(delay < self.data.len(), "delay {delay} exceeds line");
        self.write_position = 0;
        self.read_position = wrap_index(-(delay as i64), self.data.len());
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.data[self.write_position] = sample;
    }

    #[inline]
    pub fn read(&self) -> f32 {
        self.data[self.read_position]
    }

    #[inline]
    pub fn advance(&mut self) {
        let len = self.data.len();
        self.write_position = (self.write_position + 1) % len;
        self.read_position = (self.read_position + 1) % len;
    }

    /// Move both cursors forward by `samples` without touching the data.
    pub fn skip(&mut self, samples: u64) {
        let len = self.data.len() as u64;
        self.write_position = ((self.write_position as u64 + samples % len) % len) as usize;
        self.read_position = ((self.read_position as u64 + samples % len) % len) as usize;
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}
