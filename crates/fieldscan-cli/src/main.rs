//! Offline field-health analysis runner.
//!
//! Decodes an image (or synthesizes a scene from coordinates / a seed string),
//! runs the analysis pipeline and writes `result.json` plus the three PNGs.

mod logger;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Parser};
use rand::rngs::StdRng;
use rand::SeedableRng;

use fieldscan_core::crops::Crop;
use fieldscan_core::{AnalysisInput, AnalysisProfile, AnalysisResult, Analyzer, ProfileKind, RasterBuffer};
use logger::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "fieldscan", about = "Crop stress analysis from RGB field imagery")]
#[command(group(ArgGroup::new("source").required(true).args(["input", "lat", "seed"])))]
struct Args {
    /// Image file to analyse (PNG, JPEG, TIFF or WebP).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Latitude for a synthetic scene.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Free-text seed for a synthetic scene.
    #[arg(long)]
    seed: Option<String>,

    /// Preset: field, water or nutrient.
    #[arg(short, long, default_value = "field")]
    profile: String,

    /// JSON profile file; takes precedence over --profile.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Crop for the irrigation estimate.
    #[arg(long)]
    crop: Option<String>,

    /// Directory for result.json and the PNG outputs.
    #[arg(short, long, default_value = "fieldscan-out")]
    out: PathBuf,

    /// Seed for confidence jitter and the forecast walk.
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Forecast start date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Analyse a synthetic scene seeded by the file name when decoding fails.
    #[arg(long)]
    synthetic_on_decode_error: bool,

    /// Print the JSON result to stdout as well.
    #[arg(long)]
    print: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn load_profile(args: &Args) -> Result<AnalysisProfile> {
    let mut profile = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading profile {}", path.display()))?;
            AnalysisProfile::from_json(&json)
                .with_context(|| format!("parsing profile {}", path.display()))?
        }
        None => args.profile.parse::<ProfileKind>()?.preset(),
    };
    if let Some(name) = &args.crop {
        profile = profile.with_crop(name.parse::<Crop>()?);
    }
    Ok(profile)
}

fn resolve_input(args: &Args, profile: &AnalysisProfile) -> Result<AnalysisInput> {
    if let Some(path) = &args.input {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        return match RasterBuffer::decode(&bytes) {
            Ok(raster) => {
                debug!(width = raster.width(), height = raster.height(), "decoded input");
                let raster = raster.fit_within(profile.max_dimension)?;
                Ok(AnalysisInput::Raster(raster))
            }
            Err(e) if args.synthetic_on_decode_error => {
                warn!(error = %e, "decode failed; falling back to synthetic scene");
                Ok(AnalysisInput::Seed(path.display().to_string()))
            }
            Err(e) => Err(e).with_context(|| format!("decoding {}", path.display())),
        };
    }
    match (args.lat, args.lon, &args.seed) {
        (Some(lat), Some(lon), _) => Ok(AnalysisInput::Coordinates { lat, lon }),
        (_, _, Some(seed)) => Ok(AnalysisInput::Seed(seed.clone())),
        _ => bail!("no input: pass --input, --lat/--lon or --seed"),
    }
}

fn write_outputs(out: &Path, result: &AnalysisResult) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let json = serde_json::to_string_pretty(result)?;
    fs::write(out.join("result.json"), json)?;

    let images = [
        ("original.png", &result.outputs.original_png),
        ("index_map.png", &result.outputs.index_map_png),
        ("heatmap.png", &result.outputs.heatmap_png),
    ];
    for (name, bytes) in images {
        let path = out.join(name);
        fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(if args.verbose { "debug" } else { "info" });

    let profile = load_profile(&args)?;
    let input = resolve_input(&args, &profile)?;
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let mut rng = match args.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let analyzer = Analyzer::new(profile)?;
    let result = analyzer.analyze(&input, as_of, &mut rng)?;
    write_outputs(&args.out, &result)?;

    info!(
        out = %args.out.display(),
        stress = result.stress.stress_percentage,
        alert = result.stress.alert_level.as_str(),
        "wrote analysis"
    );
    println!("{}", result.advisory);
    if args.print {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}
