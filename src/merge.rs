//! Result merging into the final ordered table
//!
//! Per-slice rows arrive already in series order from the scheduler; the
//! merger concatenates them, attaches the timestamp to every record and
//! the boundary attributes from the shared set, and keeps geometry only
//! when retention was requested.

use crate::boundaries::{AttrValue, BoundarySet};
use crate::errors::{Result, ZonalisError};
use crate::scheduler::SliceStats;
use crate::zonal::Statistic;
use chrono::NaiveDateTime;
use geo_types::MultiPolygon;

/// One table row: one boundary at one time step.
#[derive(Debug, Clone)]
pub struct ZonalStatRecord {
    /// Attribute values in the boundary set's schema order.
    pub attributes: Vec<AttrValue>,
    /// One entry per requested statistic; `None` is the no-data marker.
    pub stats: Vec<Option<f64>>,
    pub timestamp: NaiveDateTime,
    /// Present only when geometry retention was requested.
    pub geometry: Option<MultiPolygon<f64>>,
}

/// The merged run result.
///
/// Records are grouped by timestamp in series order; within a timestamp
/// they follow boundary-set order. Row count is always
/// `boundaries * processed slices`.
#[derive(Debug, Clone)]
pub struct ResultTable {
    pub field_names: Vec<String>,
    pub statistics: Vec<Statistic>,
    pub records: Vec<ZonalStatRecord>,
}

impl ResultTable {
    pub fn num_records(&self) -> usize {
        self.records.len()
    }
}

/// Concatenate ordered per-slice results into one [`ResultTable`].
///
/// Fails with the empty-result error when zero slices were processed; an
/// implicitly empty table is never produced.
pub fn merge(
    boundaries: &BoundarySet,
    statistics: &[Statistic],
    slices: Vec<SliceStats>,
    keep_geometry: bool,
) -> Result<ResultTable> {
    if slices.is_empty() {
        return Err(ZonalisError::EmptyResult);
    }

    let mut records = Vec::with_capacity(slices.len() * boundaries.len());
    for slice in slices {
        if slice.rows.len() != boundaries.len() {
            return Err(ZonalisError::Generic(format!(
                "Slice at {} produced {} rows for {} boundaries",
                slice.timestamp,
                slice.rows.len(),
                boundaries.len()
            )));
        }
        for (boundary, stats) in boundaries.iter().zip(slice.rows) {
            records.push(ZonalStatRecord {
                attributes: boundary.attributes().to_vec(),
                stats,
                timestamp: slice.timestamp,
                geometry: keep_geometry.then(|| boundary.geometry().clone()),
            });
        }
    }

    log::info!("Merged {} records", records.len());

    Ok(ResultTable {
        field_names: boundaries
            .field_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        statistics: statistics.to_vec(),
        records,
    })
}
