//! Nutrient-deficiency scoring and the remediation advice table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::round_to;
use crate::stress::buckets::ColorRatios;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nutrient {
    #[serde(rename = "N")]
    Nitrogen,
    #[serde(rename = "P")]
    Phosphorus,
    #[serde(rename = "K")]
    Potassium,
    #[serde(rename = "Mg")]
    Magnesium,
    #[serde(rename = "Fe")]
    Iron,
}

/// Static configuration for one nutrient.
#[derive(Debug)]
pub struct NutrientAdvice {
    pub symbol: &'static str,
    pub name: &'static str,
    pub symptom: &'static str,
    /// Days until visible symptoms at a deficiency score of zero.
    pub base_days: f64,
    pub remediation: &'static [&'static str],
}

const NITROGEN: NutrientAdvice = NutrientAdvice {
    symbol: "N",
    name: "Nitrogen",
    symptom: "uniform yellowing of older leaves",
    base_days: 18.0,
    remediation: &[
        "Side-dress with urea or ammonium nitrate",
        "Split remaining nitrogen into two applications",
        "Check drainage; waterlogging limits uptake",
    ],
};

const PHOSPHORUS: NutrientAdvice = NutrientAdvice {
    symbol: "P",
    name: "Phosphorus",
    symptom: "purple tint on leaf margins and stems",
    base_days: 24.0,
    remediation: &[
        "Band-apply diammonium phosphate near the root zone",
        "Raise soil pH toward 6.5 if acidic",
    ],
};

const POTASSIUM: NutrientAdvice = NutrientAdvice {
    symbol: "K",
    name: "Potassium",
    symptom: "brown scorching along leaf edges",
    base_days: 21.0,
    remediation: &[
        "Apply muriate of potash",
        "Maintain even soil moisture to support uptake",
    ],
};

const MAGNESIUM: NutrientAdvice = NutrientAdvice {
    symbol: "Mg",
    name: "Magnesium",
    symptom: "pale interveinal chlorosis on older leaves",
    base_days: 28.0,
    remediation: &[
        "Foliar spray of magnesium sulphate (Epsom salt)",
        "Use dolomitic lime on acidic soils",
    ],
};

const IRON: NutrientAdvice = NutrientAdvice {
    symbol: "Fe",
    name: "Iron",
    symptom: "white-yellow new growth with green veins",
    base_days: 16.0,
    remediation: &[
        "Foliar application of chelated iron",
        "Reduce bicarbonate irrigation water where possible",
    ],
};

impl Nutrient {
    pub const ALL: [Nutrient; 5] = [
        Nutrient::Nitrogen,
        Nutrient::Phosphorus,
        Nutrient::Potassium,
        Nutrient::Magnesium,
        Nutrient::Iron,
    ];

    pub fn advice(self) -> &'static NutrientAdvice {
        match self {
            Nutrient::Nitrogen => &NITROGEN,
            Nutrient::Phosphorus => &PHOSPHORUS,
            Nutrient::Potassium => &POTASSIUM,
            Nutrient::Magnesium => &MAGNESIUM,
            Nutrient::Iron => &IRON,
        }
    }

    /// Deficiency score in [0, 100] from image-level colour statistics.
    pub fn deficiency_score(self, s: &NutrientInputs) -> f64 {
        let raw = match self {
            Nutrient::Nitrogen => s.ratios.yellow * 2.0 + (0.5 - s.mean_g) * 80.0,
            Nutrient::Phosphorus => s.ratios.purple * 3.0 + (s.mean_b - s.mean_g) * 60.0,
            Nutrient::Potassium => s.ratios.brown * 2.5 + (s.mean_r - s.mean_g) * 70.0,
            Nutrient::Magnesium => s.ratios.pale_green * 2.0 + (0.6 - s.ndvi) * 30.0,
            Nutrient::Iron => s.ratios.white_yellow * 3.0 + (s.mean_r + s.mean_g - 1.2) * 40.0,
        };
        raw.clamp(0.0, 100.0)
    }

    /// `base_days − score · 0.15`, rounded to whole days.
    pub fn days_to_symptom(self, score: f64) -> i64 {
        (self.advice().base_days - score * 0.15).round() as i64
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.advice().name)
    }
}

impl FromStr for Nutrient {
    type Err = AnalysisError;

    /// Accepts the element symbol or the English name, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        Nutrient::ALL
            .into_iter()
            .find(|n| {
                let a = n.advice();
                a.symbol.eq_ignore_ascii_case(key) || a.name.eq_ignore_ascii_case(key)
            })
            .ok_or_else(|| AnalysisError::UnknownNutrient(s.to_string()))
    }
}

/// Image-level statistics the deficiency formulas read.
#[derive(Debug, Clone, Copy)]
pub struct NutrientInputs {
    pub mean_r: f64,
    pub mean_g: f64,
    pub mean_b: f64,
    pub ndvi: f64,
    pub ratios: ColorRatios,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientFinding {
    pub nutrient: Nutrient,
    pub score: f64,
    pub days_to_symptom: i64,
    pub symptom: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientReport {
    pub findings: Vec<NutrientFinding>,
    /// Nutrient with the highest score; ties go to the earlier entry of `Nutrient::ALL`.
    pub primary: Nutrient,
    pub remediation: Vec<String>,
}

impl NutrientReport {
    pub fn assess(inputs: &NutrientInputs) -> Self {
        let mut findings = Vec::with_capacity(Nutrient::ALL.len());
        let mut primary = Nutrient::Nitrogen;
        let mut best = f64::NEG_INFINITY;

        for n in Nutrient::ALL {
            let score = n.deficiency_score(inputs);
            if score > best {
                best = score;
                primary = n;
            }
            findings.push(NutrientFinding {
                nutrient: n,
                score: round_to(score, 1),
                days_to_symptom: n.days_to_symptom(score),
                symptom: n.advice().symptom.to_string(),
            });
        }

        let remediation = primary.advice().remediation.iter().map(|s| s.to_string()).collect();
        Self { findings, primary, remediation }
    }

    pub fn score(&self, nutrient: Nutrient) -> Option<f64> {
        self.findings.iter().find(|f| f.nutrient == nutrient).map(|f| f.score)
    }
}
