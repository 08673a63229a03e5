//! Stress proxy, alert tiers and image-level stress statistics.

pub mod buckets;
pub mod nutrient;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::indices::IndexSet;
use crate::round_to;
use buckets::ColorRatios;

/// Stress percentage below which a field is SAFE.
pub const MONITOR_THRESHOLD: f64 = 30.0;
/// Stress percentage at or above which a field is CRITICAL.
pub const CRITICAL_THRESHOLD: f64 = 60.0;

/// Coarse severity tier. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Safe,
    Monitor,
    Critical,
}

impl AlertLevel {
    /// Fixed step function of a stress percentage.
    pub fn from_stress(stress_percentage: f64) -> Self {
        if stress_percentage < MONITOR_THRESHOLD {
            AlertLevel::Safe
        } else if stress_percentage < CRITICAL_THRESHOLD {
            AlertLevel::Monitor
        } else {
            AlertLevel::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Safe => "SAFE",
            AlertLevel::Monitor => "MONITOR",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

/// Which per-pixel reduction turns indices into a stress proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressModel {
    /// Greenness and moisture: `(1 − ndvi)·0.5 + msi·0.5`.
    Vegetation,
    /// Adds red-edge sensitivity: `(1 − ndvi)·0.4 + (1 − ndre)·0.3 + msi·0.3`.
    Nutrient,
}

impl StressModel {
    /// Scalar stress proxy in [0, 1].
    #[inline]
    pub fn stress_proxy(self, idx: &IndexSet) -> f64 {
        let raw = match self {
            StressModel::Vegetation => (1.0 - idx.ndvi) * 0.5 + idx.msi * 0.5,
            StressModel::Nutrient => {
                (1.0 - idx.ndvi) * 0.4 + (1.0 - idx.ndre) * 0.3 + idx.msi * 0.3
            }
        };
        raw.clamp(0.0, 1.0)
    }
}

/// Confidence heuristic: `72 + min(1, sp)·18 + jitter`, jitter ∈ [0, 6).
pub fn confidence<R: Rng + ?Sized>(mean_stress_proxy: f64, rng: &mut R) -> f64 {
    let jitter: f64 = rng.gen_range(0.0..6.0);
    round_to(72.0 + mean_stress_proxy.min(1.0) * 18.0 + jitter, 1)
}

/// Soil moisture percentage implied by the image-level CWSI.
pub fn soil_moisture_estimate(cwsi: f64) -> f64 {
    round_to(((1.0 - cwsi) * 100.0).clamp(0.0, 100.0), 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub stress_percentage: f64,
    pub alert_level: AlertLevel,
    pub confidence: f64,
    pub ratios: ColorRatios,
    pub soil_moisture_estimate: f64,
}

impl StressResult {
    /// Assemble the image-level result from the mean per-pixel stress proxy.
    pub fn from_mean<R: Rng + ?Sized>(
        mean_stress_proxy: f64,
        image_cwsi: f64,
        ratios: ColorRatios,
        rng: &mut R,
    ) -> Self {
        let stress_percentage = round_to(mean_stress_proxy * 100.0, 1).clamp(0.0, 100.0);
        Self {
            stress_percentage,
            alert_level: AlertLevel::from_stress(stress_percentage),
            confidence: confidence(mean_stress_proxy, rng),
            ratios,
            soil_moisture_estimate: soil_moisture_estimate(image_cwsi),
        }
    }
}

/// Pixel-level health breakdown, percentages rounded to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthDistribution {
    pub healthy: f64,
    pub moderate: f64,
    pub critical: f64,
}

impl HealthDistribution {
    /// Band index of a stress proxy: 0 healthy (< 0.3), 1 moderate (< 0.6), 2 critical.
    #[inline]
    pub fn band(stress_proxy: f64) -> usize {
        if stress_proxy < 0.3 {
            0
        } else if stress_proxy < 0.6 {
            1
        } else {
            2
        }
    }

    pub fn from_counts(counts: [u64; 3], total: u64) -> Self {
        if total == 0 {
            return Self::default();
        }
        let pct = |c: u64| round_to(c as f64 / total as f64 * 100.0, 2);
        Self {
            healthy: pct(counts[0]),
            moderate: pct(counts[1]),
            critical: pct(counts[2]),
        }
    }
}
