//! In-memory RGBA framebuffer shared by every pipeline stage.
//!
//! Pixels are row-major, four 8-bit channels each (R, G, B, A). Analysis code
//! only ever borrows a `RasterBuffer`; rendering produces new ones.

use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::error::{AnalysisError, Result};

pub const CHANNELS: usize = 4;

/// `width · height · 4`, or `Oversized` when that does not fit in `usize`.
fn byte_len(width: usize, height: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|area| area.checked_mul(CHANNELS))
        .ok_or(AnalysisError::Oversized { width, height })
}

/// Row-major RGBA8 raster. `data.len() == width * height * 4` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl RasterBuffer {
    /// Create a raster filled with a single colour.
    pub fn new(width: usize, height: usize, fill: [u8; 4]) -> Result<Self> {
        let len = byte_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..width * height {
            data.extend_from_slice(&fill);
        }
        Ok(Self { data, width, height })
    }

    /// Wrap an existing RGBA byte vector, checking the length invariant.
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(AnalysisError::BufferLength { expected, actual: data.len() });
        }
        Ok(Self { data, width, height })
    }

    /// Decode any format the `image` crate understands into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AnalysisError::Decode(e.to_string()))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        Self::from_rgba(w as usize, h as usize, img.into_raw())
    }

    /// Lossless PNG encoding of the buffer.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        PngEncoder::new(&mut out)
            .write_image(
                &self.data,
                self.width as u32,
                self.height as u32,
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| AnalysisError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, px: [u8; 4]) {
        let i = (y * self.width + x) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&px);
    }

    /// Raw bytes of row `y` (`width * 4` long).
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let stride = self.width * CHANNELS;
        &self.data[y * stride..(y + 1) * stride]
    }

    /// Iterate pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data.chunks_exact(CHANNELS).map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Downsample so neither side exceeds `max_dim`, preserving aspect ratio.
    /// Rasters that already fit are returned unchanged.
    pub fn fit_within(&self, max_dim: usize) -> Result<Self> {
        if self.width <= max_dim && self.height <= max_dim {
            return Ok(self.clone());
        }
        if max_dim == 0 {
            return Err(AnalysisError::DegenerateInput { width: 0, height: 0 });
        }

        let scale = max_dim as f64 / self.width.max(self.height) as f64;
        let new_w = ((self.width as f64 * scale).round() as u32).max(1);
        let new_h = ((self.height as f64 * scale).round() as u32).max(1);

        let src = RgbaImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .ok_or(AnalysisError::BufferLength {
                expected: self.area() * CHANNELS,
                actual: self.data.len(),
            })?;
        let resized = image::imageops::resize(&src, new_w, new_h, FilterType::Triangle);
        Self::from_rgba(new_w as usize, new_h as usize, resized.into_raw())
    }

    /// Composite `self` over `dst` at weight `alpha`:
    /// `out = dst · (1 − alpha) + self · alpha`, fully opaque.
    /// Neither input is modified.
    pub fn blend_onto(&self, dst: &RasterBuffer, alpha: f64) -> Result<Self> {
        if self.width != dst.width || self.height != dst.height {
            return Err(AnalysisError::BufferLength {
                expected: dst.data.len(),
                actual: self.data.len(),
            });
        }
        let a = alpha.clamp(0.0, 1.0);
        let mut data = Vec::with_capacity(dst.data.len());
        for (top, base) in self.data.chunks_exact(CHANNELS).zip(dst.data.chunks_exact(CHANNELS)) {
            for ch in 0..3 {
                let v = base[ch] as f64 * (1.0 - a) + top[ch] as f64 * a;
                data.push(v.round().clamp(0.0, 255.0) as u8);
            }
            data.push(u8::MAX);
        }
        Ok(Self { data, width: dst.width, height: dst.height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: usize, h: usize) -> RasterBuffer {
        let mut r = RasterBuffer::new(w, h, [0, 0, 0, 255]).unwrap();
        for y in 0..h {
            for x in 0..w {
                let v = ((x * 37 + y * 11) % 256) as u8;
                r.set(x, y, [v, 255 - v, v / 2, 255]);
            }
        }
        r
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        let err = RasterBuffer::from_rgba(4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(err, AnalysisError::BufferLength { expected: 64, actual: 10 }));
    }

    #[test]
    fn overflowing_dimensions_are_rejected() {
        let err = RasterBuffer::new(usize::MAX / 2, 3, [0; 4]).unwrap_err();
        assert!(matches!(err, AnalysisError::Oversized { height: 3, .. }));
        let err = RasterBuffer::from_rgba(usize::MAX, usize::MAX, Vec::new()).unwrap_err();
        assert!(matches!(err, AnalysisError::Oversized { .. }));
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let r = checker(17, 9);
        let png = r.encode_png().unwrap();
        let back = RasterBuffer::decode(&png).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let err = RasterBuffer::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }

    #[test]
    fn fit_within_keeps_small_rasters() {
        let r = checker(32, 16);
        assert_eq!(r.fit_within(512).unwrap(), r);
    }

    #[test]
    fn fit_within_downsamples_preserving_aspect() {
        let r = checker(1024, 256);
        let small = r.fit_within(512).unwrap();
        assert_eq!((small.width(), small.height()), (512, 128));
    }

    #[test]
    fn blend_mixes_channels_and_leaves_inputs_alone() {
        let base = RasterBuffer::new(2, 2, [0, 100, 200, 255]).unwrap();
        let top = RasterBuffer::new(2, 2, [200, 100, 0, 255]).unwrap();
        let out = top.blend_onto(&base, 0.5).unwrap();
        assert_eq!(out.get(1, 1), [100, 100, 100, 255]);
        assert_eq!(base.get(0, 0), [0, 100, 200, 255]);
        assert_eq!(top.get(0, 0), [200, 100, 0, 255]);
    }

    #[test]
    fn blend_rejects_mismatched_sizes() {
        let a = RasterBuffer::new(2, 2, [0; 4]).unwrap();
        let b = RasterBuffer::new(3, 2, [0; 4]).unwrap();
        assert!(a.blend_onto(&b, 0.5).is_err());
    }
}
