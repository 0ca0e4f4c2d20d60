//! Per-raster validation.
//!
//! Checks run in a fixed order and stop at the first fatal one:
//! readability, band count, valid data. Non-fatal conditions (missing CRS,
//! unusual sample type, negative values) are collected into a single
//! warning verdict.

use std::path::{Path, PathBuf};

use geotiff_reader::{GeoTiffReader, RasterGrid, RasterMetadata, DEFAULT_MAX_DECODE_BYTES};
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{RasterFault, RasterWarning, ValidationVerdict};

/// Verdict for one raster plus the metadata that could be read.
///
/// `metadata` is absent when the file could not be decoded or has more than
/// one band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub verdict: ValidationVerdict,
    pub metadata: Option<RasterMetadata>,
}

/// A validation report together with the decoded pixels, so a caller can
/// validate and aggregate from a single read of the file.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub report: ValidationReport,
    /// Present whenever the pixel data was decoded, including rasters that
    /// turned out to hold no valid data.
    pub grid: Option<RasterGrid>,
}

/// Validate a raster file. Never fails: every problem becomes a verdict.
pub fn validate(path: impl AsRef<Path>) -> ValidationReport {
    inspect(path).report
}

/// Validate a raster file and keep the decoded grid.
pub fn inspect(path: impl AsRef<Path>) -> Inspection {
    inspect_with_limit(path, DEFAULT_MAX_DECODE_BYTES)
}

/// Like [`inspect`], but a file whose samples would take more than
/// `max_decode_bytes` to decode is rejected as unreadable.
pub fn inspect_with_limit(path: impl AsRef<Path>, max_decode_bytes: usize) -> Inspection {
    let path = path.as_ref();

    let invalid = |fault: RasterFault, metadata: Option<RasterMetadata>, grid: Option<RasterGrid>| {
        warn!(path = %path.display(), reason = %fault, "Raster rejected");
        Inspection {
            report: ValidationReport {
                path: path.to_path_buf(),
                verdict: ValidationVerdict::Invalid(fault),
                metadata,
            },
            grid,
        }
    };

    let mut reader = match GeoTiffReader::open_with_limit(path, max_decode_bytes) {
        Ok(r) => r,
        Err(e) => return invalid(RasterFault::Unreadable(e.to_string()), None, None),
    };

    match reader.band_count() {
        Ok(1) => {}
        Ok(n) => return invalid(RasterFault::MultiBand(n), None, None),
        Err(e) => return invalid(RasterFault::Unreadable(e.to_string()), None, None),
    }

    let metadata = match reader.metadata() {
        Ok(m) => m,
        Err(e) => return invalid(RasterFault::Unreadable(e.to_string()), None, None),
    };

    let grid = match reader.read_grid(&metadata) {
        Ok(g) => g,
        Err(e) => return invalid(RasterFault::Unreadable(e.to_string()), None, None),
    };

    if !grid.has_valid_data() {
        return invalid(RasterFault::NoValidData, Some(metadata), Some(grid));
    }

    let warnings = collect_warnings(&metadata, &grid);
    let verdict = if warnings.is_empty() {
        ValidationVerdict::Valid
    } else {
        ValidationVerdict::Warning(warnings)
    };

    debug!(
        path = %path.display(),
        width = metadata.width,
        height = metadata.height,
        extent = ?metadata.extent(),
        crs = ?metadata.crs,
        nodata = ?metadata.nodata,
        verdict = %verdict,
        "Validated raster"
    );

    Inspection {
        report: ValidationReport {
            path: path.to_path_buf(),
            verdict,
            metadata: Some(metadata),
        },
        grid: Some(grid),
    }
}

fn collect_warnings(metadata: &RasterMetadata, grid: &RasterGrid) -> Vec<RasterWarning> {
    let mut warnings = Vec::new();

    if metadata.crs.is_none() {
        warnings.push(RasterWarning::NoCrs);
    }

    if !metadata.pixel_dtype.is_accepted() {
        warnings.push(RasterWarning::UnusualDtype(metadata.pixel_dtype));
    }

    if grid.valid_values().any(|v| v < 0.0) {
        warnings.push(RasterWarning::NegativeValues);
    }

    warnings
}
