//! Colour ramps for the false-colour index map and the stress heatmap.

use serde::{Deserialize, Serialize};

/// Which ramp colours the NDVI map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColormapKind {
    /// Nine discrete bands from open water to dense canopy.
    Spectral9,
    /// Linear red → green over ndvi ∈ [−1, 1].
    RedGreen,
}

impl ColormapKind {
    pub fn ndvi_color(self, ndvi: f64) -> [u8; 3] {
        match self {
            ColormapKind::Spectral9 => ndvi_spectral(ndvi),
            ColormapKind::RedGreen => ndvi_red_green(ndvi),
        }
    }
}

/// Upper (exclusive) NDVI bound of each band and its colour.
const NDVI_BANDS: [(f64, [u8; 3]); 8] = [
    (-0.1, [8, 48, 140]),    // deep water
    (0.0, [150, 150, 150]),  // bare / built
    (0.1, [165, 0, 38]),     // exposed soil
    (0.2, [215, 48, 39]),
    (0.3, [244, 109, 67]),
    (0.4, [254, 224, 139]),  // sparse
    (0.6, [166, 217, 106]),
    (0.8, [26, 152, 80]),
];
const NDVI_TOP: [u8; 3] = [0, 90, 50]; // dense canopy

pub fn ndvi_spectral(ndvi: f64) -> [u8; 3] {
    NDVI_BANDS
        .iter()
        .find(|(upper, _)| ndvi < *upper)
        .map(|(_, c)| *c)
        .unwrap_or(NDVI_TOP)
}

pub fn ndvi_red_green(ndvi: f64) -> [u8; 3] {
    let t = ((ndvi + 1.0) / 2.0).clamp(0.0, 1.0);
    [
        (255.0 * (1.0 - t)).round() as u8,
        (255.0 * t).round() as u8,
        0,
    ]
}

/// Heatmap stops: flat cyan up to 0.15, then linear through
/// green, yellow, orange and red to crimson at 1.0.
const STRESS_STOPS: [(f64, [u8; 3]); 6] = [
    (0.15, [0, 220, 230]),  // cyan
    (0.30, [40, 200, 60]),  // green
    (0.50, [250, 230, 40]), // yellow
    (0.70, [255, 140, 0]),  // orange
    (0.85, [230, 30, 30]),  // red
    (1.00, [140, 0, 30]),   // crimson
];

pub fn stress_heat(stress_proxy: f64) -> [u8; 3] {
    let t = stress_proxy.clamp(0.0, 1.0);
    if t <= STRESS_STOPS[0].0 {
        return STRESS_STOPS[0].1;
    }
    for pair in STRESS_STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            return lerp_rgb(c0, c1, f);
        }
    }
    STRESS_STOPS[STRESS_STOPS.len() - 1].1
}

#[inline]
fn lerp_rgb(a: [u8; 3], b: [u8; 3], f: f64) -> [u8; 3] {
    let mut out = [0u8; 3];
    for i in 0..3 {
        out[i] = (a[i] as f64 + (b[i] as f64 - a[i] as f64) * f).round() as u8;
    }
    out
}
