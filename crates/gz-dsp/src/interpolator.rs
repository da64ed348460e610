//! Catmull-Rom resampling interpolator.
//!
//! Stateful across calls: the last five input samples and the fractional
//! read position survive between blocks, so a stream can be resampled one
//! hop at a time without seams.

const HISTORY: usize = 5;

/// Four-point Catmull-Rom interpolator over a streaming input.
#[derive(Clone, Debug)]
pub struct CatmullRomInterpolator {
    history: [f32; HISTORY],
    sub_sample_pos: f64,
}

impl Default for CatmullRomInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl CatmullRomInterpolator {
    pub fn new() -> Self {
        Self {
            history: [0.0; HISTORY],
            sub_sample_pos: 1.0,
        }
    }

    /// Clear history and return to the initial position.
    pub fn reset(&mut self) {
        self.history = [0.0; HISTORY];
        self.sub_sample_pos = 1.0;
    }

    /// Fill `output` by stepping through `input` at `ratio` input samples per
    /// output sample. Returns the number of input samples consumed.
    ///
    /// `input` must hold at least `ceil(output.len() * ratio) + 1` samples.
    /// If it runs dry, silence is interpolated in place of the missing tail.
    pub fn process(&mut self, ratio: f64, input: &[f32], output: &mut [f32]) -> usize {
        if ratio == 1.0 && self.sub_sample_pos == 1.0 && input.len() >= output.len() {
            let n = output.len();
            output.copy_from_slice(&input[..n]);
            for &s in &input[n.saturating_sub(HISTORY)..n] {
                self.push(s);
            }
            return n;
        }

        let mut used = 0;
        let mut pos = self.sub_sample_pos;
        for out in output.iter_mut() {
            while pos >= 1.0 {
                let sample = match input.get(used) {
                    Some(&s) => {
                        used += 1;
                        s
                    }
                    None => {
                        debug_assert!(false, "interpolator input exhausted");
                        0.0
                    }
                };
                self.push(sample);
                pos -= 1.0;
            }
            *out = self.value_at_offset(pos as f32);
            pos += ratio;
        }
        self.sub_sample_pos = pos;
        used
    }

    #[inline]
    fn push(&mut self, sample: f32) {
        self.history.copy_within(0..HISTORY - 1, 1);
        self.history[0] = sample;
    }

    #[inline]
    fn value_at_offset(&self, offset: f32) -> f32 {
        let y0 = self.history[3];
        let y1 = self.history[2];
        let y2 = self.history[1];
        let y3 = self.history[0];

        let half_y0 = 0.5 * y0;
        let half_y3 = 0.5 * y3;

        y1 + offset
            * ((0.5 * y2 - half_y0)
                + offset
                    * (((y0 + 2.0 * y2) - (half_y3 + 2.5 * y1))
                        + offset * ((half_y3 + 1.5 * y1) - (half_y0 + 1.5 * y2))))
    }
}
