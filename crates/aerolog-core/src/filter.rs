//! Exponential smoothing for the noisy analog air signal

/// One step of a fixed-weight exponential moving average.
///
/// `alpha` is the weight given to history; `1 - alpha` goes to the new sample.
#[inline]
pub fn smooth(previous: f32, raw: f32, alpha: f32) -> f32 {
    previous * alpha + raw * (1.0 - alpha)
}

/// Smoothed value that persists for the lifetime of the process.
///
/// There is no reset: the filter is seeded with a plausible value at startup
/// so the first displayed reading is not a cold-start outlier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoother {
    alpha: f32,
    value: f32,
}

impl Smoother {
    pub const fn new(alpha: f32, initial: f32) -> Self {
        Self {
            alpha,
            value: initial,
        }
    }

    /// Fold a new raw sample in and return the updated value.
    pub fn update(&mut self, raw: f32) -> f32 {
        self.value = smooth(self.value, raw, self.alpha);
        self.value
    }

    pub const fn value(&self) -> f32 {
        self.value
    }
}
