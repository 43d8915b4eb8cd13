//! Per-slice zonal statistics
//!
//! [`compute`] is a pure function: one grid plus one boundary set in, one
//! statistics row per boundary out. Cell membership is decided by the
//! touch policy, nodata cells never contribute, and a boundary whose
//! entire overlap is nodata gets an explicit no-data marker for every
//! statistic rather than zeros.

use crate::boundaries::BoundarySet;
use crate::errors::{Result, ZonalisError};
use crate::geotransform::GeoTransform;
use geo::{Contains, Intersects};
use geo_types::Point;
use ndarray::ArrayView2;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Supported summary statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Min,
    Max,
    Mean,
    Median,
    Mode,
    Sum,
    Std,
    Count,
    Range,
}

impl Statistic {
    /// Every supported statistic, in canonical column order.
    pub const ALL: [Statistic; 9] = [
        Statistic::Min,
        Statistic::Max,
        Statistic::Mean,
        Statistic::Median,
        Statistic::Mode,
        Statistic::Sum,
        Statistic::Std,
        Statistic::Count,
        Statistic::Range,
    ];

    /// Canonical column name.
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Mode => "mode",
            Statistic::Sum => "sum",
            Statistic::Std => "std",
            Statistic::Count => "count",
            Statistic::Range => "range",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Statistic {
    type Err = ZonalisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(Statistic::Min),
            "max" => Ok(Statistic::Max),
            "mean" => Ok(Statistic::Mean),
            "median" => Ok(Statistic::Median),
            "mode" | "majority" => Ok(Statistic::Mode),
            "sum" => Ok(Statistic::Sum),
            "std" | "stdev" | "standard-deviation" => Ok(Statistic::Std),
            "count" => Ok(Statistic::Count),
            "range" => Ok(Statistic::Range),
            other => Err(ZonalisError::UnsupportedStatistic {
                name: other.to_string(),
            }),
        }
    }
}

/// Parse a comma-separated statistics list into an ordered set.
///
/// Duplicates keep their first position; an unrecognized token fails the
/// whole list, naming the token. An empty list is rejected because the
/// statistic set is fixed for the entire run.
pub fn parse_statistics(spec: &str) -> Result<Vec<Statistic>> {
    let mut statistics = Vec::new();
    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let stat = Statistic::from_str(token)?;
        if !statistics.contains(&stat) {
            statistics.push(stat);
        }
    }
    if statistics.is_empty() {
        return Err(ZonalisError::UnsupportedStatistic {
            name: spec.to_string(),
        });
    }
    Ok(statistics)
}

/// Compute one statistics row per boundary for a single grid.
///
/// `all_touched = false` includes a cell iff its center lies inside the
/// boundary; `true` additionally includes any cell whose rectangle
/// intersects the boundary, so enabling it can only grow the cell set.
/// Returns one `Vec<Option<f64>>` per boundary, parallel to `statistics`;
/// `None` marks a boundary whose overlapping cells were all nodata.
pub fn compute(
    boundaries: &BoundarySet,
    grid: ArrayView2<'_, f64>,
    transform: &GeoTransform,
    statistics: &[Statistic],
    all_touched: bool,
) -> Result<Vec<Vec<Option<f64>>>> {
    if statistics.is_empty() {
        return Err(ZonalisError::Generic(
            "No statistics requested".to_string(),
        ));
    }
    let (nrows, ncols) = grid.dim();
    if nrows == 0 || ncols == 0 {
        return Err(ZonalisError::Generic(format!(
            "Grid has degenerate shape {}x{}",
            nrows, ncols
        )));
    }

    let mut rows = Vec::with_capacity(boundaries.len());
    for boundary in boundaries.iter() {
        let mut values = Vec::new();
        if let Some((row_range, col_range)) = transform.window(boundary.bbox(), nrows, ncols) {
            let geometry = boundary.geometry();
            for row in row_range {
                for col in col_range.clone() {
                    let value = grid[(row, col)];
                    if transform.is_nodata(value) {
                        continue;
                    }
                    let (x, y) = transform.cell_center(row, col);
                    let included = geometry.contains(&Point::new(x, y))
                        || (all_touched
                            && geometry
                                .intersects(&transform.cell_rect(row, col).to_polygon()));
                    if included {
                        values.push(value);
                    }
                }
            }
        }
        rows.push(summarize(&mut values, statistics));
    }
    Ok(rows)
}

/// Summarize one boundary's valid cell values.
///
/// Sorts once and serves every requested statistic from the sorted slice.
/// An empty value set yields the no-data marker for every statistic,
/// count included.
fn summarize(values: &mut [f64], statistics: &[Statistic]) -> Vec<Option<f64>> {
    if values.is_empty() {
        return vec![None; statistics.len()];
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n = values.len() as f64;
    let min = values[0];
    let max = values[values.len() - 1];
    let sum: f64 = values.iter().sum();
    let mean = sum / n;

    statistics
        .iter()
        .map(|stat| {
            Some(match stat {
                Statistic::Min => min,
                Statistic::Max => max,
                Statistic::Mean => mean,
                Statistic::Median => median(values),
                Statistic::Mode => mode(values),
                Statistic::Sum => sum,
                Statistic::Std => population_std(values, mean),
                Statistic::Count => n,
                Statistic::Range => max - min,
            })
        })
        .collect()
}

/// Median of pre-sorted data. For even length, averages the middle two values.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn median(sorted: &[f64]) -> f64 {
    assert!(!sorted.is_empty(), "median: input must not be empty");
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Most frequent value of pre-sorted data; ties break to the smallest value.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn mode(sorted: &[f64]) -> f64 {
    assert!(!sorted.is_empty(), "mode: input must not be empty");
    let mut best = sorted[0];
    let mut best_count = 0usize;
    let mut current = sorted[0];
    let mut count = 0usize;
    for &v in sorted {
        if v == current {
            count += 1;
        } else {
            current = v;
            count = 1;
        }
        // Strict comparison keeps the smallest value on ties, since the
        // ascending scan reaches it first.
        if count > best_count {
            best = current;
            best_count = count;
        }
    }
    best
}

/// Population standard deviation (N denominator) around a precomputed mean.
fn population_std(values: &[f64], mean: f64) -> f64 {
    let n = values.len() as f64;
    let variance = values.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / n;
    variance.sqrt()
}
