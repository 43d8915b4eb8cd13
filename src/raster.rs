//! NetCDF raster time-series reading
//!
//! Opens a gridded (time, y, x) NetCDF variable, derives the affine
//! geotransform from its coordinate axes, decodes the CF-style time axis,
//! and yields the series as a lazy, finite, single-pass sequence of
//! [`TimeSlice`]s. Grids are read per slice, not all at once.

use crate::errors::{Result, ZonalisError};
use crate::geotransform::GeoTransform;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use ndarray::Array2;
use netcdf::AttributeValue;
use std::path::Path;

/// One timestamped 2D grid of the series.
#[derive(Debug, Clone)]
pub struct TimeSlice {
    pub timestamp: NaiveDateTime,
    pub grid: Array2<f64>,
}

/// An open gridded time-series container.
///
/// Construction resolves everything that can fail up front (variables,
/// axes, georeferencing, time decoding); iterating the slices afterwards
/// only performs per-step grid reads.
#[derive(Debug)]
pub struct RasterTimeSeries {
    file: netcdf::File,
    path: String,
    value_var: String,
    time_pos: usize,
    shape: (usize, usize),
    timestamps: Vec<NaiveDateTime>,
    transform: GeoTransform,
}

impl RasterTimeSeries {
    /// The shared affine transform of every slice in the series.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Decoded time coordinate, in file (chronological) order.
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Number of time steps in the series.
    pub fn num_slices(&self) -> usize {
        self.timestamps.len()
    }

    /// Grid shape as (rows, cols).
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Consume the handle into a lazy slice iterator.
    ///
    /// The sequence is finite and single-pass; reopening the source is the
    /// only way to iterate it again.
    pub fn slices(self) -> TimeSlices {
        TimeSlices {
            series: self,
            next: 0,
        }
    }

    fn read_slice(&self, index: usize) -> Result<TimeSlice> {
        let var = self
            .file
            .variable(&self.value_var)
            .ok_or_else(|| {
                ZonalisError::raster_open(
                    &self.path,
                    format!("value variable '{}' disappeared", self.value_var),
                )
            })?;

        let (nrows, ncols) = self.shape;
        let values: Vec<f64> = match self.time_pos {
            0 => var.get_values::<f64, _>((index..index + 1, 0..nrows, 0..ncols))?,
            1 => var.get_values::<f64, _>((0..nrows, index..index + 1, 0..ncols))?,
            _ => var.get_values::<f64, _>((0..nrows, 0..ncols, index..index + 1))?,
        };

        Ok(TimeSlice {
            timestamp: self.timestamps[index],
            grid: Array2::from_shape_vec((nrows, ncols), values)?,
        })
    }
}

/// Lazy iterator over the slices of a [`RasterTimeSeries`].
pub struct TimeSlices {
    series: RasterTimeSeries,
    next: usize,
}

impl Iterator for TimeSlices {
    type Item = Result<TimeSlice>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.series.num_slices() {
            return None;
        }
        let item = self.series.read_slice(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.series.num_slices() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimeSlices {}

/// Open a NetCDF time-series container.
///
/// `value_var` is the gridded variable to aggregate; `time_var` names both
/// the time dimension and its coordinate variable. Fails when either is
/// absent, the value variable is not (time, y, x) shaped, the spatial
/// coordinate axes are missing or degenerate, or the time axis cannot be
/// decoded.
pub fn open(path: &Path, value_var: &str, time_var: &str) -> Result<RasterTimeSeries> {
    let source = path.display().to_string();
    let file =
        netcdf::open(path).map_err(|e| ZonalisError::raster_open(&source, e.to_string()))?;

    let (time_pos, shape, timestamps, transform) = {
        let var = file.variable(value_var).ok_or_else(|| {
            ZonalisError::raster_open(&source, format!("value variable '{}' not found", value_var))
        })?;

        let dim_names: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        let dim_lens: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        if dim_names.len() != 3 {
            return Err(ZonalisError::raster_open(
                &source,
                format!(
                    "value variable '{}' has {} dimensions, expected (time, y, x)",
                    value_var,
                    dim_names.len()
                ),
            ));
        }

        let time_pos = dim_names
            .iter()
            .position(|d| d == time_var)
            .ok_or_else(|| {
                ZonalisError::raster_open(
                    &source,
                    format!(
                        "value variable '{}' has no '{}' dimension",
                        value_var, time_var
                    ),
                )
            })?;

        let spatial: Vec<usize> = (0..3).filter(|&i| i != time_pos).collect();
        let (y_pos, x_pos) = (spatial[0], spatial[1]);
        let shape = (dim_lens[y_pos], dim_lens[x_pos]);

        let ys = read_axis(&file, &dim_names[y_pos], &source)?;
        let xs = read_axis(&file, &dim_names[x_pos], &source)?;

        let nodata = fill_value(&var);
        let transform = GeoTransform::from_axes(&xs, &ys, nodata)
            .map_err(|e| ZonalisError::raster_open(&source, e.to_string()))?;

        let time_coord = file.variable(time_var).ok_or_else(|| {
            ZonalisError::raster_open(
                &source,
                format!("time coordinate variable '{}' not found", time_var),
            )
        })?;
        let time_values: Vec<f64> = time_coord.get_values::<f64, _>(..)?;
        let units = string_attribute(&time_coord, "units").ok_or_else(|| {
            ZonalisError::raster_open(
                &source,
                format!("time variable '{}' has no 'units' attribute", time_var),
            )
        })?;
        let timestamps = decode_cf_times(&time_values, &units)
            .map_err(|e| ZonalisError::raster_open(&source, e.to_string()))?;

        if timestamps.len() != dim_lens[time_pos] {
            return Err(ZonalisError::raster_open(
                &source,
                format!(
                    "time coordinate has {} values but the '{}' dimension has length {}",
                    timestamps.len(),
                    time_var,
                    dim_lens[time_pos]
                ),
            ));
        }

        (time_pos, shape, timestamps, transform)
    };

    log::info!(
        "Opened {}: {} time steps of {}x{} cells, nodata {:?}",
        source,
        timestamps.len(),
        shape.0,
        shape.1,
        transform.nodata()
    );

    Ok(RasterTimeSeries {
        file,
        path: source,
        value_var: value_var.to_string(),
        time_pos,
        shape,
        timestamps,
        transform,
    })
}

fn read_axis(file: &netcdf::File, dim_name: &str, source: &str) -> Result<Vec<f64>> {
    let coord = file.variable(dim_name).ok_or_else(|| {
        ZonalisError::raster_open(
            source,
            format!("coordinate variable '{}' not found", dim_name),
        )
    })?;
    Ok(coord.get_values::<f64, _>(..)?)
}

fn string_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn fill_value(var: &netcdf::Variable) -> Option<f64> {
    for name in ["_FillValue", "missing_value"] {
        let value = var.attribute(name).and_then(|attr| match attr.value().ok()? {
            AttributeValue::Double(v) => Some(v),
            AttributeValue::Float(v) => Some(f64::from(v)),
            AttributeValue::Int(v) => Some(f64::from(v)),
            AttributeValue::Short(v) => Some(f64::from(v)),
            _ => None,
        });
        if value.is_some() {
            return value;
        }
    }
    None
}

/// Decode CF-style `"<unit> since <epoch>"` time values.
///
/// Supports seconds, minutes, hours and days with fractional values.
/// Calendar attributes are ignored; the proleptic Gregorian calendar is
/// assumed.
pub fn decode_cf_times(values: &[f64], units: &str) -> Result<Vec<NaiveDateTime>> {
    let (unit, epoch_str) = units.split_once(" since ").ok_or_else(|| {
        ZonalisError::Generic(format!(
            "Cannot decode time units '{}': expected '<unit> since <epoch>'",
            units
        ))
    })?;

    let unit_seconds = match unit.trim().to_ascii_lowercase().as_str() {
        "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        other => {
            return Err(ZonalisError::Generic(format!(
                "Unsupported time unit '{}'",
                other
            )))
        }
    };

    let epoch = parse_epoch(epoch_str.trim())?;

    values
        .iter()
        .map(|&v| {
            let millis = (v * unit_seconds * 1000.0).round();
            if !millis.is_finite() {
                return Err(ZonalisError::Generic(format!(
                    "Non-finite time coordinate value {}",
                    v
                )));
            }
            Ok(epoch + Duration::milliseconds(millis as i64))
        })
        .collect()
}

fn parse_epoch(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim_end_matches('Z').trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN));
    }
    Err(ZonalisError::Generic(format!(
        "Cannot parse time epoch '{}'",
        s
    )))
}
