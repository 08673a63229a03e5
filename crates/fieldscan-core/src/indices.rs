//! Vegetation, moisture and chlorophyll indices over synthesized bands.
//!
//! Every ratio carries an explicit epsilon in its denominator, so no index
//! is ever NaN or infinite. Values are kept at full precision; the serialized
//! form is rounded to three decimals.

use serde::{Deserialize, Serialize, Serializer};

use crate::bands::BandSample;
use crate::round_to;

/// Denominator guard for the normalised-difference ratios.
pub const EPSILON: f64 = 0.001;

/// Display ceiling applied to MSI when rendering or reporting.
pub const MSI_DISPLAY_MAX: f64 = 2.0;

#[inline]
pub fn ndvi(s: &BandSample) -> f64 {
    (s.nir - s.r) / (s.nir + s.r + EPSILON)
}

#[inline]
pub fn ndre(s: &BandSample) -> f64 {
    (s.nir - s.red_edge) / (s.nir + s.red_edge + EPSILON)
}

#[inline]
pub fn msi(s: &BandSample) -> f64 {
    s.swir / (s.nir + EPSILON)
}

#[inline]
pub fn cwsi(msi: f64) -> f64 {
    (msi * 0.6).min(1.0)
}

/// Soil-adjusted vegetation index with L = 0.5.
#[inline]
pub fn savi(s: &BandSample) -> f64 {
    (s.nir - s.r) / (s.nir + s.r + 0.5) * 1.5
}

/// Largest EVI magnitude reported; the index saturates at its gain.
pub const EVI_LIMIT: f64 = 2.5;

/// Enhanced vegetation index. The denominator can cross zero for blue-heavy
/// pixels; within `EPSILON` of zero the index is 0, and the result is
/// clamped to `±EVI_LIMIT`.
#[inline]
pub fn evi(s: &BandSample) -> f64 {
    let den = s.nir + 6.0 * s.r - 7.5 * s.b + 1.0;
    if den.abs() < EPSILON {
        return 0.0;
    }
    (2.5 * (s.nir - s.r) / den).clamp(-EVI_LIMIT, EVI_LIMIT)
}

#[inline]
pub fn gndvi(s: &BandSample) -> f64 {
    (s.nir - s.g) / (s.nir + s.g + EPSILON)
}

/// Red-edge chlorophyll proxy, floored at zero.
#[inline]
pub fn chl(s: &BandSample) -> f64 {
    (s.nir / (s.red_edge + EPSILON) - 1.0).max(0.0)
}

/// Thermal-condition proxy: blend of the pixel's stress proxy and red brightness.
#[inline]
pub fn tci(s: &BandSample, stress_proxy: f64) -> f64 {
    (stress_proxy * 0.7 + s.r * 0.3).clamp(0.0, 1.0)
}

fn round3<S: Serializer>(v: &f64, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_f64(round_to(*v, 3))
}

fn round3_opt<S: Serializer>(v: &Option<f64>, ser: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(x) => ser.serialize_some(&round_to(*x, 3)),
        None => ser.serialize_none(),
    }
}

/// The index family for one sample (a pixel, or the image-mean colour).
/// `gndvi`, `chl` and `tci` are only populated for extended profiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexSet {
    #[serde(serialize_with = "round3")]
    pub ndvi: f64,
    #[serde(serialize_with = "round3")]
    pub ndre: f64,
    #[serde(serialize_with = "round3")]
    pub msi: f64,
    #[serde(serialize_with = "round3")]
    pub cwsi: f64,
    #[serde(serialize_with = "round3")]
    pub savi: f64,
    #[serde(serialize_with = "round3")]
    pub evi: f64,
    #[serde(serialize_with = "round3_opt", skip_serializing_if = "Option::is_none", default)]
    pub gndvi: Option<f64>,
    #[serde(serialize_with = "round3_opt", skip_serializing_if = "Option::is_none", default)]
    pub chl: Option<f64>,
    #[serde(serialize_with = "round3_opt", skip_serializing_if = "Option::is_none", default)]
    pub tci: Option<f64>,
}

impl IndexSet {
    /// The six base indices. Extended fields are left empty.
    pub fn core(s: &BandSample) -> Self {
        let msi = msi(s);
        Self {
            ndvi: ndvi(s),
            ndre: ndre(s),
            msi,
            cwsi: cwsi(msi),
            savi: savi(s),
            evi: evi(s),
            gndvi: None,
            chl: None,
            tci: None,
        }
    }

    /// Fill in the extended indices. `stress_proxy` must come from the same sample.
    pub fn with_extended(mut self, s: &BandSample, stress_proxy: f64) -> Self {
        self.gndvi = Some(gndvi(s));
        self.chl = Some(chl(s));
        self.tci = Some(tci(s, stress_proxy));
        self
    }

    /// MSI clamped to the display range [0, 2].
    pub fn display_msi(&self) -> f64 {
        self.msi.clamp(0.0, MSI_DISPLAY_MAX)
    }
}
