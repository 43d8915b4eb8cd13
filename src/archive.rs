//! Boundary archive extraction
//!
//! Boundary datasets arrive as a zip archive holding the shapefile's
//! geometry, attribute and projection members. Extraction happens once,
//! into a temporary working directory that lives as long as the run.

use crate::errors::{Result, ZonalisError};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

/// Extract a boundary zip archive and locate the `.shp` member.
///
/// Returns the working directory together with the shapefile path inside
/// it; the caller must keep the [`TempDir`] alive while the boundaries are
/// in use.
pub fn extract_boundary_archive(archive_path: &Path) -> Result<(TempDir, PathBuf)> {
    let file = File::open(archive_path)
        .map_err(|e| ZonalisError::boundary_load(archive_path.display(), e.to_string()))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| ZonalisError::boundary_load(archive_path.display(), e.to_string()))?;

    let workdir = TempDir::new()?;
    archive
        .extract(workdir.path())
        .map_err(|e| ZonalisError::boundary_load(archive_path.display(), e.to_string()))?;

    log::info!(
        "Extracted {} archive members to {}",
        archive.len(),
        workdir.path().display()
    );

    let shp_path = find_shapefile(workdir.path())?.ok_or_else(|| {
        ZonalisError::boundary_load(
            archive_path.display(),
            "archive contains no .shp vector layer",
        )
    })?;

    Ok((workdir, shp_path))
}

/// Walk the extracted tree for the first `.shp` member.
fn find_shapefile(dir: &Path) -> Result<Option<PathBuf>> {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&current)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|e| e.path())
            .collect();
        entries.sort();
        for path in entries {
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("shp")) {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}
