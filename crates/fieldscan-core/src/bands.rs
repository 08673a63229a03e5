//! Pseudo-spectral band synthesis from visible RGB.
//!
//! NIR, SWIR and red-edge are approximated as clamped linear combinations of
//! the colour channels. Every index downstream is computed from these bands,
//! so the mapping is the only place the approximation is defined.

use serde::{Deserialize, Serialize};

/// One pixel's normalised colour channels plus the synthesized bands.
/// All values lie in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSample {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub nir: f64,
    pub swir: f64,
    pub red_edge: f64,
}

impl BandSample {
    /// Synthesize bands from channels already normalised to [0, 1].
    #[inline]
    pub fn from_rgb(r: f64, g: f64, b: f64) -> Self {
        let nir = (g * 1.45).min(1.0);
        let swir = (r * 0.55 + b * 0.25).min(1.0);
        let red_edge = (g * 0.6 + nir * 0.4).min(1.0);
        Self { r, g, b, nir, swir, red_edge }
    }

    /// Synthesize bands from an 8-bit pixel. Alpha is ignored.
    #[inline]
    pub fn from_pixel(px: [u8; 4]) -> Self {
        Self::from_rgb(
            px[0] as f64 / 255.0,
            px[1] as f64 / 255.0,
            px[2] as f64 / 255.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn black_pixel_has_no_signal() {
        let s = BandSample::from_pixel([0, 0, 0, 255]);
        assert_eq!((s.nir, s.swir, s.red_edge), (0.0, 0.0, 0.0));
    }

    #[test]
    fn pure_green_saturates_nir() {
        let s = BandSample::from_pixel([0, 255, 0, 255]);
        assert_eq!(s.nir, 1.0);
        assert_eq!(s.swir, 0.0);
        assert_abs_diff_eq!(s.red_edge, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn mid_grey_follows_linear_mapping() {
        let s = BandSample::from_rgb(0.4, 0.4, 0.4);
        assert_abs_diff_eq!(s.nir, 0.58, epsilon = 1e-12);
        assert_abs_diff_eq!(s.swir, 0.32, epsilon = 1e-12);
        assert_abs_diff_eq!(s.red_edge, 0.472, epsilon = 1e-12);
    }

    #[test]
    fn bands_stay_in_unit_range() {
        for v in (0..=255).step_by(15) {
            let s = BandSample::from_pixel([v as u8, 255 - v as u8, v as u8, 255]);
            for band in [s.nir, s.swir, s.red_edge] {
                assert!((0.0..=1.0).contains(&band), "band {band} out of range for v={v}");
            }
        }
    }
}
