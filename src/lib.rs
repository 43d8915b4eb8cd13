//! zonalis: per-region zonal statistics for NetCDF raster time series
//!
//! A Rust library for binning gridded time-series raster values by static
//! vector boundary polygons. For every time step of the series, zonalis
//! computes one row of summary statistics per boundary and merges the
//! per-step results into a single table ordered by time, then by boundary.
//!
//! ## Key Features
//!
//! - **Load once, reuse everywhere**: the boundary set is parsed in a
//!   single pass into a read-only handle shared by every worker
//! - **Parallel Processing**: one aggregation task per time slice,
//!   scheduled on a bounded Rayon pool with a shared read-only context
//! - **Deterministic Output**: results come back in chronological order
//!   regardless of task completion order; sequential and parallel runs
//!   produce identical tables
//! - **Explicit no-data handling**: nodata cells never enter an aggregate,
//!   and an all-nodata overlap yields marked (not zero) statistics
//!
//! ## Module Organization
//!
//! - [`boundaries`]: shapefile boundary loading into an immutable set
//! - [`archive`]: boundary zip archive extraction
//! - [`raster`]: NetCDF time-series reading and geotransform derivation
//! - [`geotransform`]: affine cell-index to coordinate mapping
//! - [`zonal`]: the pure per-slice zonal statistics computation
//! - [`scheduler`]: the parallel per-slice task scheduler
//! - [`merge`]: concatenation into the final ordered table
//! - [`export`]: CSV/TSV export of the merged table
//! - [`config`]: validated run configuration
//! - [`pipeline`]: end-to-end orchestration
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use zonalis::config::RawConfig;
//! use zonalis::pipeline;
//! use std::path::PathBuf;
//!
//! let config = RawConfig::new(
//!     PathBuf::from("boundaries.zip"),
//!     PathBuf::from("drought.nc"),
//! )
//! .validate()
//! .unwrap();
//!
//! let summary = pipeline::run(&config).unwrap();
//! println!("{} records", summary.table.num_records());
//! ```

// Core modules
pub mod archive;
pub mod boundaries;
pub mod config;
pub mod errors;
pub mod export;
pub mod geotransform;
pub mod merge;
pub mod pipeline;
pub mod raster;
pub mod scheduler;
pub mod zonal;

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::boundaries::{AttrValue, Boundary, BoundarySet, FieldKind};
    pub use crate::config::{RawConfig, RunConfig};
    pub use crate::errors::{Result, ZonalisError};
    pub use crate::export::OutputFormat;
    pub use crate::geotransform::GeoTransform;
    pub use crate::merge::{ResultTable, ZonalStatRecord};
    pub use crate::raster::{RasterTimeSeries, TimeSlice};
    pub use crate::scheduler::{SchedulerConfig, WorkerContext};
    pub use crate::zonal::Statistic;
}
