//! Colour-rule pixel buckets used for chlorosis / scorch / pigment ratios.
//!
//! Rules are tested in a fixed order and the first match wins, so every pixel
//! lands in at most one bucket.

use serde::{Deserialize, Serialize};

use crate::round_to;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBucket {
    WhiteYellow,
    Yellow,
    Brown,
    Purple,
    PaleGreen,
}

impl ColorBucket {
    /// Evaluation order of the rules.
    pub const ALL: [ColorBucket; 5] = [
        ColorBucket::WhiteYellow,
        ColorBucket::Yellow,
        ColorBucket::Brown,
        ColorBucket::Purple,
        ColorBucket::PaleGreen,
    ];

    /// Classify a pixel with channels normalised to [0, 1].
    pub fn classify(r: f64, g: f64, b: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|bucket| bucket.matches(r, g, b))
    }

    fn matches(self, r: f64, g: f64, b: f64) -> bool {
        match self {
            ColorBucket::WhiteYellow => r > 0.8 && g > 0.8 && b > 0.5,
            ColorBucket::Yellow => r > 0.7 && g > 0.6 && b < 0.3,
            ColorBucket::Brown => r > 0.35 && r <= 0.7 && g > 0.15 && g < 0.5 && b < 0.3 && r > g,
            ColorBucket::Purple => r > 0.3 && b > 0.3 && g < 0.8 * r.min(b),
            ColorBucket::PaleGreen => g > 0.5 && g > r && g > b && r > 0.4 && b >= 0.3,
        }
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

/// Per-bucket pixel counts. Partial counts from separate row bands merge by addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounts {
    counts: [u64; 5],
}

impl BucketCounts {
    #[inline]
    pub fn add(&mut self, r: f64, g: f64, b: f64) {
        if let Some(bucket) = ColorBucket::classify(r, g, b) {
            self.counts[bucket.slot()] += 1;
        }
    }

    pub fn merge(&mut self, other: &BucketCounts) {
        for (a, b) in self.counts.iter_mut().zip(other.counts.iter()) {
            *a += b;
        }
    }

    pub fn count(&self, bucket: ColorBucket) -> u64 {
        self.counts[bucket.slot()]
    }

    /// Convert to percentages of `total` pixels, one decimal place.
    pub fn ratios(&self, total: u64) -> ColorRatios {
        let pct = |bucket| {
            if total == 0 {
                0.0
            } else {
                round_to(self.count(bucket) as f64 / total as f64 * 100.0, 1)
            }
        };
        ColorRatios {
            yellow: pct(ColorBucket::Yellow),
            brown: pct(ColorBucket::Brown),
            purple: pct(ColorBucket::Purple),
            pale_green: pct(ColorBucket::PaleGreen),
            white_yellow: pct(ColorBucket::WhiteYellow),
        }
    }
}

/// Bucket fractions as percentages of all image pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorRatios {
    pub yellow: f64,
    pub brown: f64,
    pub purple: f64,
    pub pale_green: f64,
    pub white_yellow: f64,
}
