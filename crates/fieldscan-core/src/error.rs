use thiserror::Error;

/// Every way an analysis call can fail. Nothing here is retried; the caller
/// sees the first failure.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode PNG output: {0}")]
    Encode(String),

    #[error("Raster has zero area: width={width}, height={height}")]
    DegenerateInput { width: usize, height: usize },

    #[error("Raster dimensions overflow: width={width}, height={height}")]
    Oversized { width: usize, height: usize },

    #[error("Raster buffer holds {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("Invalid analysis profile: {0}")]
    InvalidProfile(String),

    #[error("Unknown crop: {0}")]
    UnknownCrop(String),

    #[error("Unknown nutrient: {0}")]
    UnknownNutrient(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
