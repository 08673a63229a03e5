//! Diagnostic visualizer: writes colormap legends, synthesized bands and the
//! zone grid of a seeded scene to data/debug/.
//! Not part of the main pipeline; no tests.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

use fieldscan_core::bands::BandSample;
use fieldscan_core::render::colormap::{stress_heat, ColormapKind};
use fieldscan_core::zones::ZoneGrid;
use fieldscan_core::{AnalysisInput, AnalysisProfile, Analyzer, RasterBuffer};

const LEGEND_W: u32 = 512;
const STRIP_H: u32 = 32;
/// Pixels per zone cell in zone_grid.png.
const CELL_PX: u32 = 48;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn save(img: &image::RgbImage, dir: &Path, name: &str) -> Result<()> {
    let path = dir.join(name);
    img.save(&path).with_context(|| format!("failed to save {name}"))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// One horizontal colour ramp per row band.
fn legend() -> image::RgbImage {
    let strips: [&dyn Fn(f64) -> [u8; 3]; 3] = [
        &|t: f64| ColormapKind::Spectral9.ndvi_color(t * 2.0 - 1.0),
        &|t: f64| ColormapKind::RedGreen.ndvi_color(t * 2.0 - 1.0),
        &stress_heat,
    ];
    let mut img = image::RgbImage::new(LEGEND_W, STRIP_H * strips.len() as u32);
    for (i, color) in strips.iter().enumerate() {
        for x in 0..LEGEND_W {
            let t = x as f64 / (LEGEND_W - 1) as f64;
            let px = image::Rgb(color(t));
            for y in 0..STRIP_H {
                img.put_pixel(x, i as u32 * STRIP_H + y, px);
            }
        }
    }
    img
}

/// Grayscale view of one synthesized band.
fn band_image(raster: &RasterBuffer, band: impl Fn(&BandSample) -> f64) -> image::RgbImage {
    let mut img = image::RgbImage::new(raster.width() as u32, raster.height() as u32);
    for y in 0..raster.height() {
        for x in 0..raster.width() {
            let v = band(&BandSample::from_pixel(raster.get(x, y)));
            let c = (v.clamp(0.0, 1.0) * 255.0) as u8;
            img.put_pixel(x as u32, y as u32, image::Rgb([c, c, c]));
        }
    }
    img
}

/// Zone cells as flat heat-coloured blocks with dark separators.
fn zone_image(grid: &ZoneGrid) -> image::RgbImage {
    let w = grid.cols as u32 * CELL_PX;
    let h = grid.rows as u32 * CELL_PX;
    let mut img = image::RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let px = if x % CELL_PX == 0 || y % CELL_PX == 0 {
                image::Rgb([20u8, 20, 20])
            } else {
                let (row, col) = ((y / CELL_PX) as usize, (x / CELL_PX) as usize);
                image::Rgb(stress_heat(grid.get(row, col)))
            };
            img.put_pixel(x, y, px);
        }
    }
    img
}

fn rgba_to_rgb(raster: &RasterBuffer) -> image::RgbImage {
    let mut img = image::RgbImage::new(raster.width() as u32, raster.height() as u32);
    for y in 0..raster.height() {
        for x in 0..raster.width() {
            let [r, g, b, _] = raster.get(x, y);
            img.put_pixel(x as u32, y as u32, image::Rgb([r, g, b]));
        }
    }
    img
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let out_dir = Path::new("data/debug");
    fs::create_dir_all(out_dir).context("cannot create data/debug/")?;

    // ── 1. colormap_legend.png ───────────────────────────────────────────────
    save(&legend(), out_dir, "colormap_legend.png")?;

    // ── 2-4. Seeded scene and its synthesized bands ──────────────────────────
    let analyzer = Analyzer::new(AnalysisProfile::field())?;
    let input = AnalysisInput::Seed("visualize-42".to_string());
    let raster = analyzer.resolve_raster(&input)?;
    println!("Synthesized scene ({}×{})", raster.width(), raster.height());

    save(&rgba_to_rgb(&raster), out_dir, "scenario.png")?;
    save(&band_image(&raster, |s| s.nir), out_dir, "band_nir.png")?;
    save(&band_image(&raster, |s| s.swir), out_dir, "band_swir.png")?;

    // ── 5-6. Full analysis: zone grid and heatmap overlay ────────────────────
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).context("invalid date")?;
    let result = analyzer.analyze(&input, as_of, &mut StdRng::seed_from_u64(42))?;
    save(&zone_image(&result.zones), out_dir, "zone_grid.png")?;
    save(&rgba_to_rgb(&result.outputs.heatmap), out_dir, "heatmap.png")?;

    println!(
        "Stress {:.1}% ({}), {} priority zones",
        result.stress.stress_percentage,
        result.stress.alert_level.as_str(),
        result.priority_zones.len()
    );
    println!("Done.");
    Ok(())
}
