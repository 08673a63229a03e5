//! Fixed-resolution spatial binning of per-pixel stress.
//!
//! Pixel `(x, y)` of a `W × H` raster falls into cell
//! `(floor(x / W · cols), floor(y / H · rows))`. Each cell reports the mean
//! stress proxy of its pixels, or 0 when no pixel maps to it.

use serde::{Deserialize, Serialize};

use crate::round_to;

/// Grid resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub cols: usize,
    pub rows: usize,
}

impl GridSpec {
    pub const fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Flat cell index for pixel `(x, y)` of a `width × height` raster.
    #[inline]
    pub fn cell_of(&self, x: usize, y: usize, width: usize, height: usize) -> usize {
        let zx = ((x * self.cols) / width).min(self.cols - 1);
        let zy = ((y * self.rows) / height).min(self.rows - 1);
        zy * self.cols + zx
    }
}

/// Running per-cell sums. Accumulators built over disjoint row bands merge
/// by plain addition.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneAccumulator {
    spec: GridSpec,
    width: usize,
    height: usize,
    sums: Vec<f64>,
    counts: Vec<u64>,
}

impl ZoneAccumulator {
    pub fn new(spec: GridSpec, width: usize, height: usize) -> Self {
        Self {
            spec,
            width,
            height,
            sums: vec![0.0; spec.cell_count()],
            counts: vec![0; spec.cell_count()],
        }
    }

    #[inline]
    pub fn add(&mut self, x: usize, y: usize, stress_proxy: f64) {
        let cell = self.spec.cell_of(x, y, self.width, self.height);
        self.sums[cell] += stress_proxy;
        self.counts[cell] += 1;
    }

    pub fn merge(&mut self, other: &ZoneAccumulator) {
        for (a, b) in self.sums.iter_mut().zip(other.sums.iter()) {
            *a += b;
        }
        for (a, b) in self.counts.iter_mut().zip(other.counts.iter()) {
            *a += b;
        }
    }

    pub fn finish(self) -> ZoneGrid {
        let cells = self
            .sums
            .iter()
            .zip(self.counts.iter())
            .map(|(&s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
            .collect();
        ZoneGrid { cols: self.spec.cols, rows: self.spec.rows, cells, counts: self.counts }
    }
}

/// Mean stress proxy per grid cell, row-major (`rows × cols`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneGrid {
    pub cols: usize,
    pub rows: usize,
    /// Mean stress proxy in [0, 1] per cell.
    pub cells: Vec<f64>,
    /// Number of pixels assigned to each cell.
    pub counts: Vec<u64>,
}

/// A cell flagged for remediation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityZone {
    pub row: usize,
    pub col: usize,
    /// Cell stress as a percentage, one decimal.
    pub stress_percentage: f64,
}

impl ZoneGrid {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols + col]
    }

    /// Pixel-count-weighted mean of all cells. Equals the whole-image mean
    /// stress proxy up to floating rounding.
    pub fn weighted_mean(&self) -> f64 {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .cells
            .iter()
            .zip(self.counts.iter())
            .map(|(&v, &c)| v * c as f64)
            .sum();
        sum / total as f64
    }

    /// Cells whose stress percentage is at least `threshold_percent`,
    /// most stressed first. Ties keep row-major order.
    pub fn priority_cells(&self, threshold_percent: f64) -> Vec<PriorityZone> {
        let mut out: Vec<PriorityZone> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(i, &v)| self.counts[*i] > 0 && v * 100.0 >= threshold_percent)
            .map(|(i, &v)| PriorityZone {
                row: i / self.cols,
                col: i % self.cols,
                stress_percentage: round_to(v * 100.0, 1),
            })
            .collect();
        out.sort_by(|a, b| {
            b.stress_percentage
                .partial_cmp(&a.stress_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }
}
