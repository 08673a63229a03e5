//! Per-feature analysis configuration.
//!
//! Field analysis, water stress and nutrient deficiency share one pipeline;
//! everything that differs between them lives in an `AnalysisProfile`.

use serde::{Deserialize, Serialize};

use crate::crops::Crop;
use crate::error::{AnalysisError, Result};
use crate::forecast::ForecastParams;
use crate::render::colormap::ColormapKind;
use crate::stress::StressModel;
use crate::zones::GridSpec;

/// Largest raster side the pipeline expects; callers downsample beyond this.
pub const DEFAULT_MAX_DIMENSION: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Field,
    Water,
    Nutrient,
}

impl ProfileKind {
    pub fn preset(self) -> AnalysisProfile {
        match self {
            ProfileKind::Field => AnalysisProfile::field(),
            ProfileKind::Water => AnalysisProfile::water(),
            ProfileKind::Nutrient => AnalysisProfile::nutrient(),
        }
    }
}

impl std::str::FromStr for ProfileKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "field" => Ok(ProfileKind::Field),
            "water" => Ok(ProfileKind::Water),
            "nutrient" => Ok(ProfileKind::Nutrient),
            other => Err(AnalysisError::InvalidProfile(format!("unknown profile kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisProfile {
    pub kind: ProfileKind,
    pub stress_model: StressModel,
    pub grid: GridSpec,
    /// Heatmap weight when compositing over the original, 0–1.
    pub heatmap_alpha: f64,
    pub ndvi_colormap: ColormapKind,
    /// Compute gndvi / chl / tci as well.
    pub extended_indices: bool,
    pub forecast: ForecastParams,
    /// Zone stress percentage at which a cell is reported for remediation.
    pub priority_threshold: f64,
    pub max_dimension: usize,
    /// Enables the irrigation estimate.
    pub crop: Option<Crop>,
}

impl AnalysisProfile {
    pub fn field() -> Self {
        Self {
            kind: ProfileKind::Field,
            stress_model: StressModel::Vegetation,
            grid: GridSpec::new(8, 6),
            heatmap_alpha: 0.5,
            ndvi_colormap: ColormapKind::Spectral9,
            extended_indices: true,
            forecast: ForecastParams { bias: 0.42, spread: 10.0 },
            priority_threshold: 50.0,
            max_dimension: DEFAULT_MAX_DIMENSION,
            crop: None,
        }
    }

    pub fn water() -> Self {
        Self {
            kind: ProfileKind::Water,
            grid: GridSpec::new(6, 4),
            heatmap_alpha: 0.45,
            ndvi_colormap: ColormapKind::RedGreen,
            extended_indices: false,
            forecast: ForecastParams { bias: 0.40, spread: 12.0 },
            ..Self::field()
        }
    }

    pub fn nutrient() -> Self {
        Self {
            kind: ProfileKind::Nutrient,
            stress_model: StressModel::Nutrient,
            grid: GridSpec::new(4, 4),
            heatmap_alpha: 0.55,
            forecast: ForecastParams { bias: 0.45, spread: 8.0 },
            ..Self::field()
        }
    }

    pub fn with_crop(mut self, crop: Crop) -> Self {
        self.crop = Some(crop);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(AnalysisError::InvalidProfile(msg));
        if !(0.0..=1.0).contains(&self.heatmap_alpha) {
            return fail(format!("heatmap_alpha {} outside [0, 1]", self.heatmap_alpha));
        }
        if self.grid.cols == 0 || self.grid.rows == 0 {
            return fail(format!("zone grid {}x{} is empty", self.grid.cols, self.grid.rows));
        }
        if !self.forecast.spread.is_finite() || self.forecast.spread < 0.0 {
            return fail(format!("forecast spread {} must be finite and non-negative", self.forecast.spread));
        }
        if !self.forecast.bias.is_finite() {
            return fail("forecast bias must be finite".to_string());
        }
        if !(0.0..=100.0).contains(&self.priority_threshold) {
            return fail(format!("priority_threshold {} outside [0, 100]", self.priority_threshold));
        }
        if self.max_dimension == 0 {
            return fail("max_dimension must be positive".to_string());
        }
        Ok(())
    }

    /// Parse a JSON profile. Missing fields come from the preset named by
    /// `kind` (field when absent); the result is validated.
    pub fn from_json(json: &str) -> Result<Self> {
        let o: ProfileOverrides =
            serde_json::from_str(json).map_err(|e| AnalysisError::InvalidProfile(e.to_string()))?;
        let profile = o.apply();
        profile.validate()?;
        Ok(profile)
    }
}

impl Default for AnalysisProfile {
    fn default() -> Self {
        Self::field()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileOverrides {
    kind: Option<ProfileKind>,
    stress_model: Option<StressModel>,
    grid: Option<GridSpec>,
    heatmap_alpha: Option<f64>,
    ndvi_colormap: Option<ColormapKind>,
    extended_indices: Option<bool>,
    forecast: Option<ForecastParams>,
    priority_threshold: Option<f64>,
    max_dimension: Option<usize>,
    crop: Option<Crop>,
}

impl ProfileOverrides {
    fn apply(self) -> AnalysisProfile {
        let base = self.kind.unwrap_or(ProfileKind::Field).preset();
        AnalysisProfile {
            kind: base.kind,
            stress_model: self.stress_model.unwrap_or(base.stress_model),
            grid: self.grid.unwrap_or(base.grid),
            heatmap_alpha: self.heatmap_alpha.unwrap_or(base.heatmap_alpha),
            ndvi_colormap: self.ndvi_colormap.unwrap_or(base.ndvi_colormap),
            extended_indices: self.extended_indices.unwrap_or(base.extended_indices),
            forecast: self.forecast.unwrap_or(base.forecast),
            priority_threshold: self.priority_threshold.unwrap_or(base.priority_threshold),
            max_dimension: self.max_dimension.unwrap_or(base.max_dimension),
            crop: self.crop.or(base.crop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for kind in [ProfileKind::Field, ProfileKind::Water, ProfileKind::Nutrient] {
            let p = kind.preset();
            assert_eq!(p.kind, kind);
            p.validate().unwrap();
            assert!((0.45..=0.55).contains(&p.heatmap_alpha));
        }
        assert_eq!(AnalysisProfile::field().grid, GridSpec::new(8, 6));
    }

    #[test]
    fn json_overrides_start_from_named_preset() {
        let p = AnalysisProfile::from_json(r#"{"kind":"water","crop":"maize","heatmap_alpha":0.5}"#).unwrap();
        assert_eq!(p.kind, ProfileKind::Water);
        assert_eq!(p.grid, GridSpec::new(6, 4));
        assert_eq!(p.heatmap_alpha, 0.5);
        assert_eq!(p.crop, Some(Crop::Maize));
    }

    #[test]
    fn json_rejects_unknown_crop_and_fields() {
        assert!(AnalysisProfile::from_json(r#"{"crop":"barley"}"#).is_err());
        assert!(AnalysisProfile::from_json(r#"{"colour":"red"}"#).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut p = AnalysisProfile::field();
        p.heatmap_alpha = 1.5;
        assert!(matches!(p.validate(), Err(AnalysisError::InvalidProfile(_))));

        let mut p = AnalysisProfile::field();
        p.grid = GridSpec::new(0, 3);
        assert!(p.validate().is_err());

        let mut p = AnalysisProfile::water();
        p.forecast.spread = -1.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn kind_parses_from_str() {
        assert_eq!("Nutrient".parse::<ProfileKind>().unwrap(), ProfileKind::Nutrient);
        assert!("soil".parse::<ProfileKind>().is_err());
    }
}
