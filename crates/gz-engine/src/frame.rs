//! Audio frame type.

/// A stereo audio frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self {
            left: 0.0,
            right: 0.0,
        }
    }

    /// Place a mono sample with a constant-power pan in `[-100, 100]`.
    #[inline]
    pub fn panned(sample: f32, pan: f32) -> Self {
        let (left, right) = pan_gains(pan);
        Self {
            left: sample * left,
            right: sample * right,
        }
    }

    /// Mix another frame into this one.
    #[inline]
    pub fn mix(&mut self, other: Frame) {
        self.left += other.left;
        self.right += other.right;
    }
}

/// Left and right gains for a pan in `[-100, 100]`.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let p = (pan / 200.0 + 0.5).clamp(0.0, 1.0);
    ((1.0 - p).sqrt(), p.sqrt())
}
