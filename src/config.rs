//! Run configuration and fail-fast validation
//!
//! An external CLI or embedding layer fills in a [`RawConfig`]; validation
//! parses the statistics list and output format and checks the input
//! paths before any aggregation work begins. Unrecognized statistic or
//! format tokens fail here, never mid-run.

use crate::errors::{Result, ZonalisError};
use crate::export::OutputFormat;
use crate::scheduler::SchedulerConfig;
use crate::zonal::{self, Statistic};
use std::path::PathBuf;
use std::str::FromStr;

/// Default statistics list, matching the full supported set.
pub const DEFAULT_STATISTICS: &str = "min,max,mean,median,mode,sum,std,count,range";

/// Default gridded value variable name.
pub const DEFAULT_VALUE_VAR: &str = "scpdsi";

/// Default time coordinate variable name.
pub const DEFAULT_TIME_VAR: &str = "time";

/// Unvalidated configuration as delivered by the CLI/config layer.
#[derive(Debug, Clone)]
pub struct RawConfig {
    /// Boundary zip archive, or a bare `.shp` path.
    pub boundary_source: PathBuf,
    /// NetCDF raster time-series path.
    pub raster: PathBuf,
    pub value_var: String,
    pub time_var: String,
    /// Comma-separated statistics list.
    pub statistics: String,
    pub all_touched: bool,
    pub keep_geometry: bool,
    pub output_dir: PathBuf,
    /// Output file stem; the format's extension is appended.
    pub output_file: String,
    pub output_format: String,
    pub num_workers: Option<usize>,
    pub skip_failed: bool,
}

impl RawConfig {
    /// A configuration with the original tool's defaults.
    pub fn new(boundary_source: PathBuf, raster: PathBuf) -> Self {
        Self {
            boundary_source,
            raster,
            value_var: DEFAULT_VALUE_VAR.to_string(),
            time_var: DEFAULT_TIME_VAR.to_string(),
            statistics: DEFAULT_STATISTICS.to_string(),
            all_touched: false,
            keep_geometry: false,
            output_dir: PathBuf::from("."),
            output_file: "zonal_stats".to_string(),
            output_format: "csv".to_string(),
            num_workers: None,
            skip_failed: false,
        }
    }

    /// Validate into a [`RunConfig`], failing fast on unrecognized
    /// statistics or format tags and on missing input files.
    pub fn validate(self) -> Result<RunConfig> {
        let statistics = zonal::parse_statistics(&self.statistics)?;
        let format = OutputFormat::from_str(&self.output_format)?;

        if !self.boundary_source.exists() {
            return Err(ZonalisError::boundary_load(
                self.boundary_source.display(),
                "file does not exist",
            ));
        }
        if !self.raster.exists() {
            return Err(ZonalisError::raster_open(
                self.raster.display(),
                "file does not exist",
            ));
        }

        let output_path = format.extension().map(|ext| {
            self.output_dir
                .join(format!("{}.{}", self.output_file, ext))
        });

        Ok(RunConfig {
            boundary_source: self.boundary_source,
            raster: self.raster,
            value_var: self.value_var,
            time_var: self.time_var,
            statistics,
            all_touched: self.all_touched,
            keep_geometry: self.keep_geometry,
            output_path,
            format,
            scheduler: SchedulerConfig::new(self.num_workers, self.skip_failed),
        })
    }
}

/// Validated configuration consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub boundary_source: PathBuf,
    pub raster: PathBuf,
    pub value_var: String,
    pub time_var: String,
    pub statistics: Vec<Statistic>,
    pub all_touched: bool,
    pub keep_geometry: bool,
    /// `None` when the format prints to stdout.
    pub output_path: Option<PathBuf>,
    pub format: OutputFormat,
    pub scheduler: SchedulerConfig,
}
