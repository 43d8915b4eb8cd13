//! Affine geotransform mapping raster cell indices to coordinates
//!
//! The six coefficients follow the GDAL convention:
//! `x = c[0] + col * c[1] + row * c[2]` and `y = c[3] + col * c[4] + row * c[5]`,
//! with the origin at the outer edge of cell (0, 0). The transform also
//! carries the raster's nodata sentinel so every consumer applies the same
//! cell-validity rule.

use crate::errors::{Result, ZonalisError};
use geo_types::{coord, Rect};

/// Immutable affine mapping from (row, col) cell indices to (x, y)
/// coordinates, plus the nodata sentinel of the raster it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    coeffs: [f64; 6],
    nodata: Option<f64>,
}

impl GeoTransform {
    /// Create a transform from raw GDAL-order coefficients.
    pub fn new(coeffs: [f64; 6], nodata: Option<f64>) -> Self {
        Self { coeffs, nodata }
    }

    /// Derive a north-up transform from coordinate axes.
    ///
    /// `xs` and `ys` hold the cell-center coordinates of the columns and
    /// rows and must be uniformly spaced; the origin is shifted by half a
    /// cell so it sits on the grid edge. Descending axes (north-up
    /// latitude) produce a negative step, which is preserved.
    pub fn from_axes(xs: &[f64], ys: &[f64], nodata: Option<f64>) -> Result<Self> {
        if xs.len() < 2 || ys.len() < 2 {
            return Err(ZonalisError::Generic(format!(
                "Cannot derive a geotransform from degenerate axes ({} x, {} y points)",
                xs.len(),
                ys.len()
            )));
        }
        let dx = uniform_spacing(xs).ok_or_else(|| {
            ZonalisError::Generic("x coordinate axis is not uniformly spaced".to_string())
        })?;
        let dy = uniform_spacing(ys).ok_or_else(|| {
            ZonalisError::Generic("y coordinate axis is not uniformly spaced".to_string())
        })?;
        if dx == 0.0 || dy == 0.0 {
            return Err(ZonalisError::Generic(
                "Coordinate axes have zero spacing".to_string(),
            ));
        }
        let x0 = xs[0] - dx / 2.0;
        let y0 = ys[0] - dy / 2.0;
        Ok(Self::new([x0, dx, 0.0, y0, 0.0, dy], nodata))
    }

    /// The six affine coefficients in GDAL order.
    pub fn coefficients(&self) -> [f64; 6] {
        self.coeffs
    }

    /// The nodata sentinel, if the raster declares one.
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Whether a cell value is invalid (nodata sentinel or non-finite).
    pub fn is_nodata(&self, value: f64) -> bool {
        if !value.is_finite() {
            return true;
        }
        match self.nodata {
            Some(nd) => value == nd,
            None => false,
        }
    }

    /// Coordinate of the center of cell (row, col).
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let (cf, rf) = (col as f64 + 0.5, row as f64 + 0.5);
        let c = &self.coeffs;
        (c[0] + cf * c[1] + rf * c[2], c[3] + cf * c[4] + rf * c[5])
    }

    /// Axis-aligned extent of cell (row, col).
    ///
    /// Only meaningful for north-up transforms (no rotation terms), which
    /// is the only kind [`GeoTransform::from_axes`] produces.
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect<f64> {
        let c = &self.coeffs;
        let x0 = c[0] + col as f64 * c[1];
        let x1 = x0 + c[1];
        let y0 = c[3] + row as f64 * c[5];
        let y1 = y0 + c[5];
        Rect::new(
            coord! { x: x0.min(x1), y: y0.min(y1) },
            coord! { x: x0.max(x1), y: y0.max(y1) },
        )
    }

    /// Smallest (rows, cols) index window covering `extent`, clamped to a
    /// grid of `nrows` x `ncols`. Returns `None` when the extent misses the
    /// grid entirely or the transform carries rotation terms.
    pub fn window(
        &self,
        extent: &Rect<f64>,
        nrows: usize,
        ncols: usize,
    ) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let c = &self.coeffs;
        if c[2] != 0.0 || c[4] != 0.0 {
            return None;
        }

        let col_a = (extent.min().x - c[0]) / c[1];
        let col_b = (extent.max().x - c[0]) / c[1];
        let row_a = (extent.min().y - c[3]) / c[5];
        let row_b = (extent.max().y - c[3]) / c[5];

        let (col_lo, col_hi) = (col_a.min(col_b), col_a.max(col_b));
        let (row_lo, row_hi) = (row_a.min(row_b), row_a.max(row_b));

        let col_start = col_lo.floor().max(0.0) as usize;
        let row_start = row_lo.floor().max(0.0) as usize;
        let col_end = (col_hi.ceil().max(0.0) as usize).min(ncols);
        let row_end = (row_hi.ceil().max(0.0) as usize).min(nrows);

        if col_start >= col_end || row_start >= row_end {
            return None;
        }
        Some((row_start..row_end, col_start..col_end))
    }
}

/// The common step of a uniformly spaced axis, or `None` when any gap
/// deviates from the first beyond a small relative tolerance.
fn uniform_spacing(axis: &[f64]) -> Option<f64> {
    let step = axis[1] - axis[0];
    let tol = step.abs() * 1e-6;
    for pair in axis.windows(2) {
        if ((pair[1] - pair[0]) - step).abs() > tol {
            return None;
        }
    }
    Some(step)
}
