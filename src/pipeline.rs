//! End-to-end orchestration
//!
//! Wires the stages together the way a run actually flows: extract the
//! boundary archive (when one was given), load the boundary set once,
//! open the raster series, dispatch one task per slice, merge in series
//! order. Loader and reader failures abort before any aggregation starts.

use crate::boundaries::{self, BoundarySet};
use crate::config::RunConfig;
use crate::errors::Result;
use crate::merge::{self, ResultTable};
use crate::raster;
use crate::scheduler::{self, WorkerContext};
use chrono::NaiveDateTime;
use std::sync::Arc;

/// A finished run: the merged table plus, in skip mode, the timestamps
/// that were omitted and why.
#[derive(Debug)]
pub struct RunSummary {
    pub table: ResultTable,
    pub skipped: Vec<(NaiveDateTime, String)>,
}

/// Execute a full aggregation run and return the merged table.
///
/// The returned table covers the slices that succeeded; in skip mode the
/// omitted timestamps are reported in [`RunSummary::skipped`].
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let boundaries = Arc::new(load_boundaries(config)?);
    log::info!(
        "Boundary set: {} features, {} attribute fields",
        boundaries.len(),
        boundaries.fields().len()
    );

    let series = raster::open(&config.raster, &config.value_var, &config.time_var)?;
    let transform = *series.transform();

    let slices = series.slices().collect::<Result<Vec<_>>>()?;

    let ctx = WorkerContext::new(
        Arc::clone(&boundaries),
        transform,
        config.statistics.clone(),
        config.all_touched,
    );
    let output = scheduler::run(&ctx, slices, &config.scheduler)?;

    let table = merge::merge(
        &boundaries,
        &config.statistics,
        output.slices,
        config.keep_geometry,
    )?;

    Ok(RunSummary {
        table,
        skipped: output.skipped,
    })
}

/// Load the boundary set, extracting the archive first when the source is
/// not already a bare shapefile.
fn load_boundaries(config: &RunConfig) -> Result<BoundarySet> {
    let is_shapefile = config
        .boundary_source
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"));

    if is_shapefile {
        boundaries::load(&config.boundary_source)
    } else {
        // The working directory must outlive the parse, not the run; the
        // loaded set owns everything it needs.
        let (workdir, shp_path) = crate::archive::extract_boundary_archive(&config.boundary_source)?;
        let set = boundaries::load(&shp_path)?;
        drop(workdir);
        Ok(set)
    }
}
