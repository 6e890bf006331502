use std::ops::Range;

/// Range of intensities, inclusive on both ends
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ValueRange {
    /// Lower bound
    pub low: f32,
    /// Upper bound
    pub high: f32,
}

impl ValueRange {
    /// Constructs new, empty range.
    pub fn empty() -> ValueRange {
        ValueRange {
            low: f32::NAN,
            high: f32::NAN,
        }
    }

    /// Minimal range containing all `samples`
    pub fn from_samples(samples: impl IntoIterator<Item = f32>) -> ValueRange {
        let mut range = ValueRange::empty();
        for val in samples {
            range.extend(val);
        }
        range
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_nan() || self.high.is_nan()
    }

    /// Extend the range with new value.
    pub fn extend(&mut self, val: f32) {
        if self.is_empty() {
            self.low = val;
            self.high = val;
        }

        self.high = f32::max(self.high, val);
        self.low = f32::min(self.low, val);
    }

    pub fn contains(&self, val: f32) -> bool {
        self.low <= val && val <= self.high
    }

    /// Middle of the range, `NaN` if empty
    pub fn midpoint(&self) -> f32 {
        0.5 * (self.low + self.high)
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::empty()
    }
}

/// ```
/// # use volcaster::common::ValueRange;
/// let range: ValueRange = (0.0..45.5).into();
/// assert_eq!(range.high, 45.5);
/// ```
impl From<Range<f32>> for ValueRange {
    fn from(range: Range<f32>) -> Self {
        ValueRange {
            low: range.start,
            high: range.end,
        }
    }
}
