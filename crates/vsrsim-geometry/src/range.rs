//! Closed numeric intervals
//!
//! Every actuated or sensed value in the simulation lives in a declared range.
//! Consumers normalize a value from its own range into [0, 1] and denormalize it
//! into the range they work with, so heterogeneous sensors can share one input vector.

use serde::{Deserialize, Serialize};

/// Closed interval `[min, max]`
///
/// Deserialization rejects inverted or NaN bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct DoubleRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Deserialize)]
struct RawRange {
    min: f64,
    max: f64,
}

impl TryFrom<RawRange> for DoubleRange {
    type Error = String;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        if raw.min <= raw.max {
            Ok(Self {
                min: raw.min,
                max: raw.max,
            })
        } else {
            Err(format!("Invalid range: min {} must not exceed max {}", raw.min, raw.max))
        }
    }
}

impl DoubleRange {
    /// `[0, 1]`
    pub const UNIT: DoubleRange = DoubleRange { min: 0.0, max: 1.0 };
    /// `[-1, 1]`
    pub const SYMMETRIC_UNIT: DoubleRange = DoubleRange { min: -1.0, max: 1.0 };

    /// Create a range; bounds given in the wrong order are swapped
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Symmetric range `[-half_width, half_width]`
    pub fn symmetric(half_width: f64) -> Self {
        Self::new(-half_width.abs(), half_width.abs())
    }

    pub fn extent(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp `value` into the range
    ///
    /// Never panics; a range built by hand with `min > max` clips everything to `max`.
    pub fn clip(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Map `value` (clipped first) to `[0, 1]`
    ///
    /// A degenerate range maps everything to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        let extent = self.extent();
        if extent <= 0.0 {
            return 0.0;
        }
        (self.clip(value) - self.min) / extent
    }

    /// Map a normalized value in `[0, 1]` back into this range
    pub fn denormalize(&self, value: f64) -> f64 {
        self.min + value * self.extent()
    }

    /// Translate both bounds by `delta`
    pub fn delta(&self, delta: f64) -> Self {
        Self::new(self.min + delta, self.max + delta)
    }
}
