//! Field-health analysis from visible-spectrum imagery.
//!
//! Entry point is [`pipeline::Analyzer`]: it takes a raster (or a seed for a
//! synthetic scene) and an [`profile::AnalysisProfile`], and returns indices,
//! a stress classification, zone grid, rendered images and a 7-day forecast.

pub mod advisory;
pub mod bands;
pub mod crops;
pub mod error;
pub mod forecast;
pub mod indices;
pub mod pipeline;
pub mod profile;
pub mod raster;
pub mod render;
pub mod scenario;
pub mod stress;
pub mod zones;

pub use error::{AnalysisError, Result};
pub use pipeline::{AnalysisInput, AnalysisResult, Analyzer, SourceKind};
pub use profile::{AnalysisProfile, ProfileKind};
pub use raster::RasterBuffer;

/// Round half away from zero to `decimals` places.
#[inline]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
