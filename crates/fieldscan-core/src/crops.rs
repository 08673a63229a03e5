//! Closed crop table used by the water-stress profile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::round_to;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crop {
    Wheat,
    Rice,
    Cotton,
    Sugarcane,
    Maize,
    Soybean,
}

#[derive(Debug)]
pub struct CropProfile {
    pub name: &'static str,
    /// Peak-season evapotranspiration demand.
    pub water_need_mm_per_day: f64,
    /// Soil moisture percentage below which irrigation is advised.
    pub critical_moisture: f64,
}

impl Crop {
    pub const ALL: [Crop; 6] = [
        Crop::Wheat,
        Crop::Rice,
        Crop::Cotton,
        Crop::Sugarcane,
        Crop::Maize,
        Crop::Soybean,
    ];

    pub fn profile(self) -> &'static CropProfile {
        match self {
            Crop::Wheat => &CropProfile { name: "wheat", water_need_mm_per_day: 4.5, critical_moisture: 45.0 },
            Crop::Rice => &CropProfile { name: "rice", water_need_mm_per_day: 7.5, critical_moisture: 70.0 },
            Crop::Cotton => &CropProfile { name: "cotton", water_need_mm_per_day: 6.0, critical_moisture: 40.0 },
            Crop::Sugarcane => &CropProfile { name: "sugarcane", water_need_mm_per_day: 7.0, critical_moisture: 55.0 },
            Crop::Maize => &CropProfile { name: "maize", water_need_mm_per_day: 5.5, critical_moisture: 50.0 },
            Crop::Soybean => &CropProfile { name: "soybean", water_need_mm_per_day: 5.0, critical_moisture: 50.0 },
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

impl FromStr for Crop {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        Crop::ALL
            .into_iter()
            .find(|c| c.profile().name.eq_ignore_ascii_case(key))
            .ok_or_else(|| AnalysisError::UnknownCrop(s.to_string()))
    }
}

/// Daily water shortfall implied by the image-level CWSI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrigationEstimate {
    pub crop: Crop,
    pub water_need_mm_per_day: f64,
    pub deficit_mm_per_day: f64,
    pub irrigate: bool,
}

impl IrrigationEstimate {
    pub fn assess(crop: Crop, cwsi: f64, soil_moisture: f64) -> Self {
        let p = crop.profile();
        Self {
            crop,
            water_need_mm_per_day: p.water_need_mm_per_day,
            deficit_mm_per_day: round_to(p.water_need_mm_per_day * cwsi.clamp(0.0, 1.0), 1),
            irrigate: soil_moisture < p.critical_moisture,
        }
    }
}
