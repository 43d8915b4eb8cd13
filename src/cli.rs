//! Defines command-line interface options using `clap` for the zonalis application.

use clap::Parser;
use std::path::PathBuf;

/// A CLI tool for binning NetCDF time-series rasters by boundary polygons
#[derive(Parser, Debug)]
#[command(
    version,
    name = "zonalis",
    about = "Per-region zonal statistics for NetCDF raster time series"
)]
pub struct Args {
    /// Boundary dataset: a zip archive of a shapefile, or a bare .shp path
    #[arg(short = 's', long = "shape-archive")]
    pub shape_archive: PathBuf,

    /// Path to the NetCDF raster time series
    #[arg(short = 'r', long)]
    pub raster: PathBuf,

    /// Name of the gridded value variable
    #[arg(long, default_value = zonalis::config::DEFAULT_VALUE_VAR)]
    pub value_var: String,

    /// Name of the time coordinate variable
    #[arg(long, default_value = zonalis::config::DEFAULT_TIME_VAR)]
    pub time_var: String,

    /// Comma-separated statistics to compute
    #[arg(short = 'x', long, default_value = zonalis::config::DEFAULT_STATISTICS)]
    pub stats: String,

    /// Count every cell touching a boundary, not only center-contained cells
    #[arg(short = 'a', long, default_value_t = false)]
    pub all_touched: bool,

    /// Include the boundary geometry (as WKT) in the output
    #[arg(short = 'g', long, default_value_t = false)]
    pub geometry: bool,

    /// Directory for the output file
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Output file name (without extension)
    #[arg(short = 'd', long, default_value = "zonal_stats")]
    pub destination: String,

    /// Output format: csv, tsv or none (print to stdout)
    #[arg(short = 'f', long, default_value = "csv")]
    pub output_format: String,

    /// Number of worker threads. Defaults to the number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Record and skip failed time slices instead of aborting the run
    #[arg(long, default_value_t = false)]
    pub skip_errors: bool,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
