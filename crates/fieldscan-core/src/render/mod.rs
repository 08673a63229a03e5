//! Visual outputs: original, false-colour NDVI map, stress heatmap overlay.
//!
//! Rendering reads the input raster and the per-pixel maps and always
//! allocates new buffers.

pub mod colormap;

use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::raster::RasterBuffer;
use colormap::{stress_heat, ColormapKind};

/// The three rendered images, both as buffers and PNG-encoded.
#[derive(Debug, Clone)]
pub struct RasterOutputs {
    pub original_png: Vec<u8>,
    pub index_map_png: Vec<u8>,
    pub heatmap_png: Vec<u8>,
    pub index_map: RasterBuffer,
    pub heatmap: RasterBuffer,
}

fn check_len(map: &[f32], width: usize, height: usize) -> Result<()> {
    if map.len() != width * height {
        return Err(AnalysisError::BufferLength { expected: width * height, actual: map.len() });
    }
    Ok(())
}

fn colorize(width: usize, height: usize, values: &[f32], color: impl Fn(f64) -> [u8; 3]) -> Result<RasterBuffer> {
    check_len(values, width, height)?;
    let mut data = Vec::with_capacity(values.len() * 4);
    for &v in values {
        let [r, g, b] = color(v as f64);
        data.extend_from_slice(&[r, g, b, u8::MAX]);
    }
    RasterBuffer::from_rgba(width, height, data)
}

/// False-colour map of per-pixel NDVI.
pub fn render_index_map(width: usize, height: usize, ndvi: &[f32], kind: ColormapKind) -> Result<RasterBuffer> {
    colorize(width, height, ndvi, |v| kind.ndvi_color(v))
}

/// Opaque heatmap of per-pixel stress proxy, not yet composited.
pub fn render_stress_heat(width: usize, height: usize, stress: &[f32]) -> Result<RasterBuffer> {
    colorize(width, height, stress, stress_heat)
}

/// Stress heatmap blended over `original` at weight `alpha`.
pub fn render_overlay(original: &RasterBuffer, stress: &[f32], alpha: f64) -> Result<RasterBuffer> {
    let heat = render_stress_heat(original.width(), original.height(), stress)?;
    heat.blend_onto(original, alpha)
}

/// Produce and encode all three outputs.
pub fn render_outputs(
    original: &RasterBuffer,
    ndvi: &[f32],
    stress: &[f32],
    kind: ColormapKind,
    alpha: f64,
) -> Result<RasterOutputs> {
    let index_map = render_index_map(original.width(), original.height(), ndvi, kind)?;
    let heatmap = render_overlay(original, stress, alpha)?;

    let outputs = RasterOutputs {
        original_png: original.encode_png()?,
        index_map_png: index_map.encode_png()?,
        heatmap_png: heatmap.encode_png()?,
        index_map,
        heatmap,
    };
    debug!(
        original_bytes = outputs.original_png.len(),
        index_map_bytes = outputs.index_map_png.len(),
        heatmap_bytes = outputs.heatmap_png.len(),
        "encoded raster outputs"
    );
    Ok(outputs)
}
