//! Parallel per-time-slice task scheduling
//!
//! One aggregation task per time slice runs on a dedicated rayon pool. The
//! expensive inputs (boundary set, geotransform, statistic list) live in a
//! [`WorkerContext`] built once per run and shared read-only by every
//! task, so nothing is re-derived or re-transmitted per slice and no
//! locking is needed. Gathered results always come back in input time
//! order, whatever order tasks finish in.

use crate::boundaries::BoundarySet;
use crate::errors::{Result, ZonalisError};
use crate::geotransform::GeoTransform;
use crate::raster::TimeSlice;
use crate::zonal::{self, Statistic};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::Arc;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pool size; `None` uses every available CPU core.
    pub num_workers: Option<usize>,
    /// When true, a failed slice is recorded and omitted instead of
    /// aborting the run. Off by default.
    pub skip_failed: bool,
}

impl SchedulerConfig {
    pub fn new(num_workers: Option<usize>, skip_failed: bool) -> Self {
        Self {
            num_workers,
            skip_failed,
        }
    }

    /// One task at a time; useful for reproducibility checks.
    pub fn sequential() -> Self {
        Self {
            num_workers: Some(1),
            skip_failed: false,
        }
    }

    /// One worker per available CPU core.
    pub fn all_cores() -> Self {
        Self {
            num_workers: Some(num_cpus::get()),
            skip_failed: false,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_workers: None,
            skip_failed: false,
        }
    }
}

/// Read-only context seeded into the pool once per run.
///
/// Every task borrows this instead of receiving its own copy; the
/// boundary set sits behind an `Arc` so embedders can share it across
/// runs too.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    boundaries: Arc<BoundarySet>,
    transform: GeoTransform,
    statistics: Vec<Statistic>,
    all_touched: bool,
}

impl WorkerContext {
    pub fn new(
        boundaries: Arc<BoundarySet>,
        transform: GeoTransform,
        statistics: Vec<Statistic>,
        all_touched: bool,
    ) -> Self {
        Self {
            boundaries,
            transform,
            statistics,
            all_touched,
        }
    }

    pub fn boundaries(&self) -> &BoundarySet {
        &self.boundaries
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn statistics(&self) -> &[Statistic] {
        &self.statistics
    }

    pub fn all_touched(&self) -> bool {
        self.all_touched
    }
}

/// Per-slice aggregation result: one statistics row per boundary, in
/// boundary-set order.
#[derive(Debug, Clone)]
pub struct SliceStats {
    pub timestamp: NaiveDateTime,
    pub rows: Vec<Vec<Option<f64>>>,
}

/// Everything a run produced: ordered slice results plus, in skip mode,
/// the timestamps that failed and why.
#[derive(Debug)]
pub struct RunOutput {
    pub slices: Vec<SliceStats>,
    pub skipped: Vec<(NaiveDateTime, String)>,
}

/// Execute one aggregation task per time slice on a bounded worker pool.
///
/// Output order equals the input slice order exactly. By default the
/// first task failure aborts the whole run with the offending timestamp;
/// partially computed results are discarded and the pool (with its shared
/// context) is released on return either way.
pub fn run(
    ctx: &WorkerContext,
    slices: Vec<TimeSlice>,
    config: &SchedulerConfig,
) -> Result<RunOutput> {
    let workers = config.num_workers.unwrap_or_else(num_cpus::get).max(1);
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| {
            ZonalisError::ThreadPoolError(format!(
                "Failed to build pool with {} workers: {}",
                workers, e
            ))
        })?;

    log::info!(
        "Dispatching {} time slices across {} workers",
        slices.len(),
        workers
    );

    if config.skip_failed {
        let outcomes: Vec<(NaiveDateTime, Result<SliceStats>)> = pool.install(|| {
            slices
                .into_par_iter()
                .map(|slice| (slice.timestamp, aggregate_slice(ctx, slice)))
                .collect()
        });

        let mut output = RunOutput {
            slices: Vec::with_capacity(outcomes.len()),
            skipped: Vec::new(),
        };
        for (timestamp, outcome) in outcomes {
            match outcome {
                Ok(stats) => output.slices.push(stats),
                Err(e) => {
                    log::warn!("Skipping time {}: {}", timestamp.format(TIMESTAMP_FORMAT), e);
                    output.skipped.push((timestamp, e.to_string()));
                }
            }
        }
        Ok(output)
    } else {
        // collect() into Result short-circuits on the first task error,
        // cancelling outstanding work.
        let slices: Result<Vec<SliceStats>> = pool.install(|| {
            slices
                .into_par_iter()
                .map(|slice| aggregate_slice(ctx, slice))
                .collect()
        });
        Ok(RunOutput {
            slices: slices?,
            skipped: Vec::new(),
        })
    }
}

/// The per-task body: one pure aggregation over the shared context.
fn aggregate_slice(ctx: &WorkerContext, slice: TimeSlice) -> Result<SliceStats> {
    log::debug!(
        "Aggregating time {}",
        slice.timestamp.format(TIMESTAMP_FORMAT)
    );
    let rows = zonal::compute(
        ctx.boundaries(),
        slice.grid.view(),
        ctx.transform(),
        ctx.statistics(),
        ctx.all_touched(),
    )
    .map_err(|e| ZonalisError::worker_task(slice.timestamp.format(TIMESTAMP_FORMAT), e))?;

    Ok(SliceStats {
        timestamp: slice.timestamp,
        rows,
    })
}
