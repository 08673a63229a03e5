//! Pipeline orchestrator: one pass over the pixels, then image-level reductions.
//!
//! Stage order:
//!   1. Scenario synthesis (coordinate / seed inputs only)
//!   2. Per-pixel band synthesis, indices, stress proxy, colour buckets, zones
//!   3. Image-level indices from the mean colour
//!   4. Stress classification and health distribution
//!   5. Rendering
//!   6. Forecast, nutrient report, irrigation estimate, advisory

use std::borrow::Cow;
use std::ops::Range;

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::advisory::advisory_message;
use crate::bands::BandSample;
use crate::crops::IrrigationEstimate;
use crate::error::{AnalysisError, Result};
use crate::forecast::{generate_forecast, ForecastDay};
use crate::indices::IndexSet;
use crate::profile::{AnalysisProfile, ProfileKind};
use crate::raster::RasterBuffer;
use crate::render::{render_outputs, RasterOutputs};
use crate::round_to;
use crate::scenario::{self, ScenarioSeed};
use crate::stress::buckets::BucketCounts;
use crate::stress::nutrient::{NutrientInputs, NutrientReport};
use crate::stress::{HealthDistribution, StressModel, StressResult};
use crate::zones::{GridSpec, PriorityZone, ZoneAccumulator, ZoneGrid};

/// Rows per work unit of the per-pixel pass.
const ROW_BAND: usize = 64;

// ── Inputs ────────────────────────────────────────────────────────────────────

/// What the caller hands to the pipeline.
#[derive(Debug, Clone)]
pub enum AnalysisInput {
    /// A decoded, already size-capped raster.
    Raster(RasterBuffer),
    Coordinates { lat: f64, lon: f64 },
    Seed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Upload,
    Coordinates,
    Seed,
}

impl AnalysisInput {
    pub fn source_kind(&self) -> SourceKind {
        match self {
            AnalysisInput::Raster(_) => SourceKind::Upload,
            AnalysisInput::Coordinates { .. } => SourceKind::Coordinates,
            AnalysisInput::Seed(_) => SourceKind::Seed,
        }
    }
}

// ── Per-pixel pass ───────────────────────────────────────────────────────────

/// Everything gathered in the per-pixel pass. Scans of disjoint row bands
/// merge by addition (and concatenation of the per-pixel maps).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldScan {
    pub width: usize,
    pub height: usize,
    pub pixels: u64,
    sum_rgb: [f64; 3],
    sum_stress: f64,
    buckets: BucketCounts,
    health: [u64; 3],
    zones: ZoneAccumulator,
    /// Per-pixel NDVI, row-major.
    pub ndvi: Vec<f32>,
    /// Per-pixel stress proxy, row-major.
    pub stress: Vec<f32>,
}

impl FieldScan {
    fn empty(width: usize, height: usize, grid: GridSpec, capacity: usize) -> Self {
        Self {
            width,
            height,
            pixels: 0,
            sum_rgb: [0.0; 3],
            sum_stress: 0.0,
            buckets: BucketCounts::default(),
            health: [0; 3],
            zones: ZoneAccumulator::new(grid, width, height),
            ndvi: Vec::with_capacity(capacity),
            stress: Vec::with_capacity(capacity),
        }
    }

    fn scan_rows(raster: &RasterBuffer, rows: Range<usize>, model: StressModel, grid: GridSpec) -> Self {
        let width = raster.width();
        let mut scan = Self::empty(width, raster.height(), grid, rows.len() * width);

        for y in rows {
            for (x, px) in raster.row(y).chunks_exact(4).enumerate() {
                let s = BandSample::from_pixel([px[0], px[1], px[2], px[3]]);
                let idx = IndexSet::core(&s);
                let sp = model.stress_proxy(&idx);

                scan.pixels += 1;
                scan.sum_rgb[0] += s.r;
                scan.sum_rgb[1] += s.g;
                scan.sum_rgb[2] += s.b;
                scan.sum_stress += sp;
                scan.buckets.add(s.r, s.g, s.b);
                scan.health[HealthDistribution::band(sp)] += 1;
                scan.zones.add(x, y, sp);
                scan.ndvi.push(idx.ndvi as f32);
                scan.stress.push(sp as f32);
            }
        }
        scan
    }

    /// Append the scan of the rows directly below this one.
    pub fn merge(&mut self, other: FieldScan) {
        self.pixels += other.pixels;
        for (a, b) in self.sum_rgb.iter_mut().zip(other.sum_rgb) {
            *a += b;
        }
        self.sum_stress += other.sum_stress;
        self.buckets.merge(&other.buckets);
        for (a, b) in self.health.iter_mut().zip(other.health) {
            *a += b;
        }
        self.zones.merge(&other.zones);
        self.ndvi.extend(other.ndvi);
        self.stress.extend(other.stress);
    }

    /// Mean normalised (R, G, B) over all pixels.
    pub fn mean_rgb(&self) -> [f64; 3] {
        let n = self.pixels.max(1) as f64;
        [self.sum_rgb[0] / n, self.sum_rgb[1] / n, self.sum_rgb[2] / n]
    }

    pub fn mean_stress_proxy(&self) -> f64 {
        self.sum_stress / self.pixels.max(1) as f64
    }

    pub fn zone_grid(&self) -> ZoneGrid {
        self.zones.clone().finish()
    }
}

fn row_bands(height: usize) -> Vec<Range<usize>> {
    (0..height)
        .step_by(ROW_BAND)
        .map(|start| start..(start + ROW_BAND).min(height))
        .collect()
}

/// Scan fixed-size row bands and fold them top to bottom. The band layout and
/// fold order do not depend on the `threading` feature, so both builds
/// produce identical sums.
fn scan_field(raster: &RasterBuffer, model: StressModel, grid: GridSpec) -> FieldScan {
    let bands = row_bands(raster.height());

    #[cfg(feature = "threading")]
    let parts: Vec<FieldScan> = {
        use rayon::prelude::*;
        bands
            .into_par_iter()
            .map(|rows| FieldScan::scan_rows(raster, rows, model, grid))
            .collect()
    };
    #[cfg(not(feature = "threading"))]
    let parts: Vec<FieldScan> = bands
        .into_iter()
        .map(|rows| FieldScan::scan_rows(raster, rows, model, grid))
        .collect();

    let mut whole = FieldScan::empty(raster.width(), raster.height(), grid, raster.area());
    for part in parts {
        whole.merge(part);
    }
    whole
}

/// Mean absolute z-score of per-pixel NDVI; 0 for a uniform field.
pub fn ndvi_anomaly(ndvi: &[f32]) -> f64 {
    if ndvi.is_empty() {
        return 0.0;
    }
    let n = ndvi.len() as f64;
    let mu = ndvi.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = ndvi.iter().map(|&v| (v as f64 - mu).powi(2)).sum::<f64>() / n;
    let sigma = var.sqrt();
    if sigma < 1e-9 {
        return 0.0;
    }
    let mean_abs_z = ndvi.iter().map(|&v| ((v as f64 - mu) / sigma).abs()).sum::<f64>() / n;
    round_to(mean_abs_z, 4)
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Structured result handed to the presentation / persistence layer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub source: SourceKind,
    pub profile: ProfileKind,
    pub width: usize,
    pub height: usize,
    pub stress: StressResult,
    pub indices: IndexSet,
    pub distribution: HealthDistribution,
    pub ndvi_anomaly: f64,
    pub zones: ZoneGrid,
    pub priority_zones: Vec<PriorityZone>,
    pub forecast: Vec<ForecastDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrients: Option<NutrientReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irrigation: Option<IrrigationEstimate>,
    pub advisory: String,
    /// Encoded images; written out separately by callers.
    #[serde(skip)]
    pub outputs: RasterOutputs,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct Analyzer {
    profile: AnalysisProfile,
}

impl Analyzer {
    pub fn new(profile: AnalysisProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self { profile })
    }

    pub fn profile(&self) -> &AnalysisProfile {
        &self.profile
    }

    /// Resolve the input to a raster. Supplied rasters are borrowed; seeds
    /// and coordinates synthesize an owned scene.
    pub fn resolve_raster<'a>(&self, input: &'a AnalysisInput) -> Result<Cow<'a, RasterBuffer>> {
        let seed = match input {
            AnalysisInput::Raster(r) => return Ok(Cow::Borrowed(r)),
            AnalysisInput::Coordinates { lat, lon } => ScenarioSeed::Coordinates { lat: *lat, lon: *lon },
            AnalysisInput::Seed(text) => ScenarioSeed::Text(text.clone()),
        };
        let side = scenario::DEFAULT_SIZE.min(self.profile.max_dimension);
        debug!(?seed, side, "synthesizing scenario raster");
        Ok(Cow::Owned(scenario::synthesize(seed.to_u64(), side, side)?))
    }

    /// Per-pixel pass only. Refuses zero-area rasters.
    pub fn scan(&self, raster: &RasterBuffer) -> Result<FieldScan> {
        if raster.area() == 0 {
            return Err(AnalysisError::DegenerateInput { width: raster.width(), height: raster.height() });
        }
        let grid = self.profile.grid;
        if grid.cols > raster.width() || grid.rows > raster.height() {
            warn!(
                cols = grid.cols,
                rows = grid.rows,
                width = raster.width(),
                height = raster.height(),
                "zone grid exceeds raster; some cells will stay empty"
            );
        }
        if raster.width() > self.profile.max_dimension || raster.height() > self.profile.max_dimension {
            warn!(
                width = raster.width(),
                height = raster.height(),
                max = self.profile.max_dimension,
                "raster exceeds max dimension; caller should downsample"
            );
        }
        Ok(scan_field(raster, self.profile.stress_model, grid))
    }

    /// Image-level indices: the per-pixel formulas applied to the mean colour.
    pub fn image_indices(&self, scan: &FieldScan) -> IndexSet {
        let [r, g, b] = scan.mean_rgb();
        let s = BandSample::from_rgb(r, g, b);
        let idx = IndexSet::core(&s);
        if self.profile.extended_indices {
            let sp = self.profile.stress_model.stress_proxy(&idx);
            idx.with_extended(&s, sp)
        } else {
            idx
        }
    }

    /// Run the full pipeline. `rng` feeds confidence jitter and the forecast walk.
    #[instrument(skip_all, fields(profile = ?self.profile.kind, source = ?input.source_kind()))]
    pub fn analyze<R: Rng + ?Sized>(
        &self,
        input: &AnalysisInput,
        as_of: NaiveDate,
        rng: &mut R,
    ) -> Result<AnalysisResult> {
        let raster = self.resolve_raster(input)?;
        let scan = self.scan(&raster)?;
        debug!(pixels = scan.pixels, "pixel pass complete");

        let indices = self.image_indices(&scan);
        let ratios = scan.buckets.ratios(scan.pixels);
        let stress = StressResult::from_mean(scan.mean_stress_proxy(), indices.cwsi, ratios, rng);
        let distribution = HealthDistribution::from_counts(scan.health, scan.pixels);
        let ndvi_anomaly = ndvi_anomaly(&scan.ndvi);

        let zones = scan.zone_grid();
        let priority_zones = zones.priority_cells(self.profile.priority_threshold);
        debug!(cells = zones.cells.len(), priority = priority_zones.len(), "zones aggregated");

        let outputs = render_outputs(
            &raster,
            &scan.ndvi,
            &scan.stress,
            self.profile.ndvi_colormap,
            self.profile.heatmap_alpha,
        )?;

        let forecast = generate_forecast(stress.stress_percentage, self.profile.forecast, as_of, rng);

        let nutrients = (self.profile.kind == ProfileKind::Nutrient).then(|| {
            let [mean_r, mean_g, mean_b] = scan.mean_rgb();
            NutrientReport::assess(&NutrientInputs { mean_r, mean_g, mean_b, ndvi: indices.ndvi, ratios })
        });
        let irrigation = self
            .profile
            .crop
            .map(|crop| IrrigationEstimate::assess(crop, indices.cwsi, stress.soil_moisture_estimate));

        let advisory = advisory_message(stress.stress_percentage, stress.alert_level);

        info!(
            width = raster.width(),
            height = raster.height(),
            stress = stress.stress_percentage,
            alert = stress.alert_level.as_str(),
            "analysis complete"
        );

        Ok(AnalysisResult {
            source: input.source_kind(),
            profile: self.profile.kind,
            width: raster.width(),
            height: raster.height(),
            stress,
            indices,
            distribution,
            ndvi_anomaly,
            zones,
            priority_zones,
            forecast,
            nutrients,
            irrigation,
            advisory,
            outputs,
        })
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crops::Crop;
    use crate::stress::AlertLevel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn run(profile: AnalysisProfile, input: AnalysisInput, seed: u64) -> AnalysisResult {
        Analyzer::new(profile)
            .unwrap()
            .analyze(&input, as_of(), &mut StdRng::seed_from_u64(seed))
            .unwrap()
    }

    fn solid(w: usize, h: usize, px: [u8; 4]) -> AnalysisInput {
        AnalysisInput::Raster(RasterBuffer::new(w, h, px).unwrap())
    }

    #[test]
    fn zero_area_raster_is_refused() {
        let analyzer = Analyzer::new(AnalysisProfile::field()).unwrap();
        let err = analyzer
            .analyze(&solid(0, 10, [0; 4]), as_of(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateInput { width: 0, height: 10 }));
    }

    #[test]
    fn invalid_profile_is_refused() {
        let mut p = AnalysisProfile::field();
        p.heatmap_alpha = -0.1;
        assert!(Analyzer::new(p).is_err());
    }

    #[test]
    fn all_black_raster_is_defined() {
        let r = run(AnalysisProfile::field(), solid(32, 32, [0, 0, 0, 255]), 1);
        assert_eq!(r.indices.ndvi, 0.0);
        assert!(!r.stress.stress_percentage.is_nan());
        assert_eq!(r.stress.stress_percentage, 50.0);
        assert_eq!(r.stress.alert_level, AlertLevel::Monitor);
        assert_eq!(r.ndvi_anomaly, 0.0);
    }

    #[test]
    fn all_green_raster_is_safe() {
        let r = run(AnalysisProfile::field(), solid(32, 32, [0, 255, 0, 255]), 1);
        assert!(r.indices.ndvi > 0.99, "ndvi {}", r.indices.ndvi);
        assert_eq!(r.stress.alert_level, AlertLevel::Safe);
        assert!(r.stress.stress_percentage < 1.0);
        assert_eq!(r.distribution.healthy, 100.0);
    }

    #[test]
    fn half_yellow_raster_reports_fifty_percent() {
        let mut img = RasterBuffer::new(256, 256, [40, 120, 40, 255]).unwrap();
        for y in 0..256 {
            for x in 0..128 {
                img.set(x, y, [230, 200, 30, 255]);
            }
        }
        let r = run(AnalysisProfile::field(), AnalysisInput::Raster(img), 2);
        assert!((r.stress.ratios.yellow - 50.0).abs() <= 0.1, "yellow {}", r.stress.ratios.yellow);
        assert_eq!(r.stress.ratios.brown, 0.0);
    }

    #[test]
    fn image_indices_use_mean_colour_not_mean_of_pixels() {
        // Half black, half pure green: per-pixel NDVI averages to ~0.5,
        // the mean colour (0, 0.5, 0) gives ~0.998.
        let mut img = RasterBuffer::new(4, 4, [0, 0, 0, 255]).unwrap();
        for y in 0..4 {
            for x in 0..2 {
                img.set(x, y, [0, 255, 0, 255]);
            }
        }
        let r = run(AnalysisProfile::field(), AnalysisInput::Raster(img), 3);
        assert!(r.indices.ndvi > 0.99, "ndvi {}", r.indices.ndvi);
    }

    #[test]
    fn zone_grid_weighted_mean_matches_image_mean() {
        let analyzer = Analyzer::new(AnalysisProfile::field()).unwrap();
        let input = AnalysisInput::Coordinates { lat: 28.6, lon: 77.2 };
        let raster = analyzer.resolve_raster(&input).unwrap();
        let scan = analyzer.scan(&raster).unwrap();
        let grid = scan.zone_grid();
        let image_mean = scan.mean_stress_proxy();
        let rel = (grid.weighted_mean() - image_mean).abs() / image_mean.abs().max(1e-12);
        assert!(rel <= 1e-6, "relative error {rel}");
        assert_eq!((grid.cols, grid.rows), (8, 6));
    }

    #[test]
    fn identical_inputs_are_bit_identical() {
        let input = AnalysisInput::Seed("plot-17".into());
        let a = run(AnalysisProfile::nutrient(), input.clone(), 9);
        let b = run(AnalysisProfile::nutrient(), input, 9);
        assert_eq!(a.indices, b.indices);
        assert_eq!(a.stress, b.stress);
        assert_eq!(a.zones, b.zones);
        assert_eq!(a.forecast, b.forecast);
        assert_eq!(a.nutrients, b.nutrients);
    }

    #[test]
    fn result_ranges_hold_for_synthetic_fields() {
        for (i, profile) in [AnalysisProfile::field(), AnalysisProfile::water(), AnalysisProfile::nutrient()]
            .into_iter()
            .enumerate()
        {
            let r = run(profile, AnalysisInput::Coordinates { lat: 10.0 + i as f64, lon: 20.0 }, i as u64);
            assert!((0.0..=100.0).contains(&r.stress.stress_percentage));
            assert!((-1.0..=1.0).contains(&r.indices.ndvi));
            assert!(r.indices.msi >= 0.0);
            assert_eq!(r.forecast.len(), 7);
            assert_eq!(r.source, SourceKind::Coordinates);
            assert_eq!((r.width, r.height), (256, 256));
            let d = r.distribution;
            assert!((d.healthy + d.moderate + d.critical - 100.0).abs() < 0.05);
        }
    }

    #[test]
    fn profile_specific_sections() {
        let n = run(AnalysisProfile::nutrient(), AnalysisInput::Seed("a".into()), 4);
        assert!(n.nutrients.is_some());
        assert!(n.indices.chl.is_some());
        assert!(n.irrigation.is_none());

        let w = run(AnalysisProfile::water().with_crop(Crop::Cotton), AnalysisInput::Seed("a".into()), 4);
        assert!(w.nutrients.is_none());
        assert!(w.indices.gndvi.is_none());
        assert_eq!(w.irrigation.map(|i| i.crop), Some(Crop::Cotton));
        assert_eq!(w.zones.cells.len(), 24);
    }

    #[test]
    fn input_raster_is_not_mutated() {
        let img = RasterBuffer::new(16, 16, [120, 160, 60, 255]).unwrap();
        let input = AnalysisInput::Raster(img.clone());
        let r = run(AnalysisProfile::field(), input.clone(), 5);
        match input {
            AnalysisInput::Raster(after) => assert_eq!(after, img),
            _ => unreachable!(),
        }
        assert_eq!(RasterBuffer::decode(&r.outputs.original_png).unwrap(), img);
    }

    #[test]
    fn priority_zones_point_at_stressed_quadrant() {
        let mut img = RasterBuffer::new(64, 64, [0, 255, 0, 255]).unwrap();
        for y in 32..64 {
            for x in 32..64 {
                img.set(x, y, [200, 60, 180, 255]);
            }
        }
        let mut profile = AnalysisProfile::nutrient();
        profile.grid = GridSpec::new(2, 2);
        let r = run(profile, AnalysisInput::Raster(img), 6);
        assert_eq!(r.priority_zones.len(), 1);
        assert_eq!((r.priority_zones[0].row, r.priority_zones[0].col), (1, 1));
    }

    fn seeded_scene() -> RasterBuffer {
        scenario::synthesize(scenario::seed_from_text("banded"), 256, 256).unwrap()
    }

    #[test]
    fn split_scan_matches_single_pass() {
        let raster = seeded_scene();
        let (model, grid) = (StressModel::Nutrient, GridSpec::new(8, 6));
        let whole = FieldScan::scan_rows(&raster, 0..256, model, grid);

        let mut merged = FieldScan::scan_rows(&raster, 0..37, model, grid);
        merged.merge(FieldScan::scan_rows(&raster, 37..256, model, grid));

        assert_eq!(merged.pixels, whole.pixels);
        assert_eq!(merged.buckets, whole.buckets);
        assert_eq!(merged.health, whole.health);
        assert_eq!(merged.ndvi, whole.ndvi);
        assert_eq!(merged.stress, whole.stress);
        for (a, b) in merged.sum_rgb.iter().zip(whole.sum_rgb.iter()) {
            assert!((a - b).abs() <= 1e-9 * b.abs(), "rgb sum {a} vs {b}");
        }
        assert!((merged.sum_stress - whole.sum_stress).abs() <= 1e-9 * whole.sum_stress);

        let (m, w) = (merged.zone_grid(), whole.zone_grid());
        assert_eq!(m.counts, w.counts);
        for (a, b) in m.cells.iter().zip(w.cells.iter()) {
            assert!((a - b).abs() <= 1e-12, "zone cell {a} vs {b}");
        }
    }

    #[test]
    fn scan_field_folds_fixed_row_bands_in_order() {
        let raster = seeded_scene();
        let (model, grid) = (StressModel::Vegetation, GridSpec::new(4, 4));
        let bands = row_bands(256);
        assert_eq!(bands.len(), 4);
        assert_eq!(bands[3], 192..256);

        let mut expected = FieldScan::empty(256, 256, grid, 256 * 256);
        for rows in bands {
            expected.merge(FieldScan::scan_rows(&raster, rows, model, grid));
        }
        assert_eq!(scan_field(&raster, model, grid), expected);
        assert_eq!(scan_field(&raster, model, grid), scan_field(&raster, model, grid));
    }

    #[test]
    fn short_last_band_is_covered() {
        let bands = row_bands(150);
        assert_eq!(bands, vec![0..64, 64..128, 128..150]);
        assert!(row_bands(0).is_empty());
    }

    #[test]
    fn supplied_raster_is_borrowed() {
        let analyzer = Analyzer::new(AnalysisProfile::field()).unwrap();
        let input = solid(8, 8, [90, 140, 60, 255]);
        assert!(matches!(analyzer.resolve_raster(&input).unwrap(), Cow::Borrowed(_)));
        let seeded = AnalysisInput::Seed("x".into());
        assert!(matches!(analyzer.resolve_raster(&seeded).unwrap(), Cow::Owned(_)));
    }

    #[test]
    fn evi_stays_bounded_on_near_zero_denominator_pixels() {
        let r = run(AnalysisProfile::field(), solid(16, 16, [1, 120, 58, 255]), 12);
        assert!(r.indices.evi.is_finite());
        assert!(r.indices.evi.abs() <= 2.5, "evi {}", r.indices.evi);
        let json = serde_json::to_value(&r).unwrap();
        assert!(json["indices"]["evi"].as_f64().unwrap().abs() <= 2.5);
    }

    #[test]
    fn anomaly_of_two_level_field_is_one() {
        let v = [0.0f32, 1.0, 0.0, 1.0];
        assert_eq!(ndvi_anomaly(&v), 1.0);
        assert_eq!(ndvi_anomaly(&[0.3; 8]), 0.0);
    }

    #[test]
    fn result_serializes_without_image_bytes() {
        let r = run(AnalysisProfile::field(), solid(8, 8, [90, 140, 60, 255]), 8);
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("outputs").is_none());
        assert_eq!(json["forecast"].as_array().unwrap().len(), 7);
        assert_eq!(json["source"], "upload");
    }
}
