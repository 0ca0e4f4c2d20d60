//! Expansion of command-line raster arguments into an ordered file list.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

fn is_geotiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
}

/// Expand each argument: files are kept as given, directories are replaced
/// by the `.tif`/`.tiff` files beneath them, sorted by name.
pub fn collect_rasters(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut rasters = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to scan {}", path.display()))?;
                if entry.file_type().is_file() && is_geotiff(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            if found.is_empty() {
                tracing::warn!(dir = %path.display(), "No GeoTIFF files found");
            }
            rasters.extend(found);
        } else if path.exists() {
            rasters.push(path.clone());
        } else {
            bail!("No such file or directory: {}", path.display());
        }
    }

    Ok(rasters)
}
