//! Tabular export of the merged result
//!
//! The core hands the finished [`ResultTable`] to this module; everything
//! here is formatting. No-data markers become empty cells, timestamps use
//! one fixed format, and retained geometry is written as WKT.

use crate::errors::{Result, ZonalisError};
use crate::merge::ResultTable;
use geo_types::{LineString, MultiPolygon};
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use std::str::FromStr;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Tsv,
    /// Print the table to stdout instead of writing a file.
    Stdout,
}

impl OutputFormat {
    /// File extension for the format, if it writes a file.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Csv => Some("csv"),
            OutputFormat::Tsv => Some("tsv"),
            OutputFormat::Stdout => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ZonalisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "none" | "stdout" => Ok(OutputFormat::Stdout),
            other => Err(ZonalisError::UnsupportedOutputFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Write the merged table in the given format.
///
/// File formats require `path`; [`OutputFormat::Stdout`] ignores it.
/// Columns are the boundary attribute fields, one column per requested
/// statistic, a `time` column, and a trailing `geometry` column when any
/// record carries geometry.
pub fn write_table(table: &ResultTable, format: OutputFormat, path: Option<&Path>) -> Result<()> {
    if format == OutputFormat::Stdout {
        let writer = csv::WriterBuilder::new().from_writer(io::stdout());
        return write_records(table, writer);
    }

    let path = path.ok_or_else(|| {
        ZonalisError::Generic(format!("Format {:?} requires an output path", format))
    })?;
    match format {
        OutputFormat::Csv => {
            let writer = csv::WriterBuilder::new().from_path(path)?;
            write_records(table, writer)?;
        }
        OutputFormat::Tsv => {
            let writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
            write_records(table, writer)?;
        }
        OutputFormat::Stdout => unreachable!("handled above"),
    }
    log::info!("Wrote {} records to {}", table.num_records(), path.display());
    Ok(())
}

fn write_records<W: io::Write>(table: &ResultTable, mut writer: csv::Writer<W>) -> Result<()> {
    let with_geometry = table.records.iter().any(|r| r.geometry.is_some());

    let mut header: Vec<String> = table.field_names.clone();
    header.extend(table.statistics.iter().map(|s| s.name().to_string()));
    header.push("time".to_string());
    if with_geometry {
        header.push("geometry".to_string());
    }
    writer.write_record(&header)?;

    for record in &table.records {
        let mut row: Vec<String> = record.attributes.iter().map(|a| a.to_string()).collect();
        row.extend(record.stats.iter().map(|value| match value {
            Some(v) => v.to_string(),
            None => String::new(),
        }));
        row.push(record.timestamp.format(TIMESTAMP_FORMAT).to_string());
        if with_geometry {
            row.push(record.geometry.as_ref().map(wkt).unwrap_or_default());
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Format a multipolygon as WKT.
fn wkt(geometry: &MultiPolygon<f64>) -> String {
    let mut out = String::from("MULTIPOLYGON(");
    for (i, polygon) in geometry.0.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('(');
        write_ring(&mut out, polygon.exterior());
        for interior in polygon.interiors() {
            out.push(',');
            write_ring(&mut out, interior);
        }
        out.push(')');
    }
    out.push(')');
    out
}

fn write_ring(out: &mut String, ring: &LineString<f64>) {
    out.push('(');
    for (i, coord) in ring.coords().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{} {}", coord.x, coord.y);
    }
    out.push(')');
}
