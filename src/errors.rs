//! Centralized error handling for zonalis
//!
//! This module provides structured error types for every stage of the
//! pipeline, so failures always carry the offending source path, timestamp
//! or statistic token instead of a bare message.

use std::fmt;

/// Main error type for zonalis operations
#[derive(Debug)]
pub enum ZonalisError {
    /// The boundary layer could not be loaded
    BoundaryLoad { source: String, message: String },

    /// The raster time series could not be opened
    RasterOpen { source: String, message: String },

    /// A statistic token not in the supported set was requested
    UnsupportedStatistic { name: String },

    /// An output format tag not in the supported set was requested
    UnsupportedOutputFormat { format: String },

    /// A per-time-slice aggregation task failed
    WorkerTask { timestamp: String, message: String },

    /// Zero time slices were processed; no table can be produced
    EmptyResult,

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// Shapefile parsing errors
    ShapefileError(shapefile::Error),

    /// Archive extraction errors
    ZipError(zip::result::ZipError),

    /// CSV export errors
    CsvError(csv::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Generic error
    Generic(String),
}

impl ZonalisError {
    /// Boundary load failure with the offending source attached.
    pub fn boundary_load(source: impl fmt::Display, message: impl Into<String>) -> Self {
        ZonalisError::BoundaryLoad {
            source: source.to_string(),
            message: message.into(),
        }
    }

    /// Raster open failure with the offending source attached.
    pub fn raster_open(source: impl fmt::Display, message: impl Into<String>) -> Self {
        ZonalisError::RasterOpen {
            source: source.to_string(),
            message: message.into(),
        }
    }

    /// Task failure with the offending timestamp attached.
    pub fn worker_task(timestamp: impl fmt::Display, message: impl fmt::Display) -> Self {
        ZonalisError::WorkerTask {
            timestamp: timestamp.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ZonalisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZonalisError::BoundaryLoad { source, message } => {
                write!(f, "Failed to load boundaries from '{}': {}", source, message)
            }
            ZonalisError::RasterOpen { source, message } => {
                write!(f, "Failed to open raster '{}': {}", source, message)
            }
            ZonalisError::UnsupportedStatistic { name } => {
                write!(f, "Unsupported statistic '{}'", name)
            }
            ZonalisError::UnsupportedOutputFormat { format } => {
                write!(f, "Unsupported output format '{}'", format)
            }
            ZonalisError::WorkerTask { timestamp, message } => {
                write!(f, "Aggregation failed for time {}: {}", timestamp, message)
            }
            ZonalisError::EmptyResult => write!(f, "No time slices were processed"),
            ZonalisError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            ZonalisError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            ZonalisError::ShapefileError(e) => write!(f, "Shapefile error: {}", e),
            ZonalisError::ZipError(e) => write!(f, "Archive error: {}", e),
            ZonalisError::CsvError(e) => write!(f, "CSV error: {}", e),
            ZonalisError::ArrayError(e) => write!(f, "Array error: {}", e),
            ZonalisError::IoError(e) => write!(f, "I/O error: {}", e),
            ZonalisError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ZonalisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZonalisError::NetCDFError(e) => Some(e),
            ZonalisError::ShapefileError(e) => Some(e),
            ZonalisError::ZipError(e) => Some(e),
            ZonalisError::CsvError(e) => Some(e),
            ZonalisError::ArrayError(e) => Some(e),
            ZonalisError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for ZonalisError {
    fn from(error: netcdf::Error) -> Self {
        ZonalisError::NetCDFError(error)
    }
}

impl From<shapefile::Error> for ZonalisError {
    fn from(error: shapefile::Error) -> Self {
        ZonalisError::ShapefileError(error)
    }
}

impl From<zip::result::ZipError> for ZonalisError {
    fn from(error: zip::result::ZipError) -> Self {
        ZonalisError::ZipError(error)
    }
}

impl From<csv::Error> for ZonalisError {
    fn from(error: csv::Error) -> Self {
        ZonalisError::CsvError(error)
    }
}

impl From<std::io::Error> for ZonalisError {
    fn from(error: std::io::Error) -> Self {
        ZonalisError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for ZonalisError {
    fn from(error: ndarray::ShapeError) -> Self {
        ZonalisError::ArrayError(error)
    }
}

impl From<String> for ZonalisError {
    fn from(error: String) -> Self {
        ZonalisError::Generic(error)
    }
}

impl From<&str> for ZonalisError {
    fn from(error: &str) -> Self {
        ZonalisError::Generic(error.to_string())
    }
}

/// Result type alias for zonalis operations
pub type Result<T> = std::result::Result<T, ZonalisError>;
