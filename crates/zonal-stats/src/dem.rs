//! Elevation summary for a digital elevation model.

use std::path::Path;

use geotiff_reader::{GeoTiffReader, RasterGrid, DEFAULT_MAX_DECODE_BYTES};
use tracing::debug;

use crate::error::{Result, ZonalError};
use crate::types::{ElevationSummary, ZonalStats};

/// Summarize the valid cells of a single-band DEM.
///
/// # Errors
/// [`ZonalError::Unreadable`], [`ZonalError::MultiBand`] or
/// [`ZonalError::NoValidData`].
pub fn summarize_dem(path: impl AsRef<Path>) -> Result<ElevationSummary> {
    summarize_dem_with_limit(path, DEFAULT_MAX_DECODE_BYTES)
}

/// [`summarize_dem`] refusing to decode more than `max_decode_bytes`.
pub fn summarize_dem_with_limit(
    path: impl AsRef<Path>,
    max_decode_bytes: usize,
) -> Result<ElevationSummary> {
    let path = path.as_ref();
    let mut reader = GeoTiffReader::open_with_limit(path, max_decode_bytes)?;
    let metadata = reader.metadata()?;
    let grid = reader.read_grid(&metadata)?;

    let summary = summarize_grid(&grid)?;
    debug!(
        path = %path.display(),
        min = summary.min,
        max = summary.max,
        relief = summary.relief,
        "Summarized DEM"
    );

    Ok(ElevationSummary {
        crs: metadata.crs,
        resolution: metadata.resolution,
        ..summary
    })
}

/// Summary of a decoded grid. CRS is left empty and resolution is taken
/// from the grid's transform.
pub fn summarize_grid(grid: &RasterGrid) -> Result<ElevationSummary> {
    let stats = ZonalStats::from_values(grid.valid_values());
    if stats.is_empty() {
        return Err(ZonalError::NoValidData);
    }

    Ok(ElevationSummary {
        min: stats.min,
        max: stats.max,
        mean: stats.mean,
        relief: stats.max - stats.min,
        crs: None,
        resolution: grid.geotransform.resolution(),
        valid_pixel_count: stats.count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::Crs;
    use test_utils::{write_corrupt_raster, write_oversized_header, GeoTiffFixture};

    #[test]
    fn test_summary_ignores_nodata() {
        let dir = tempfile::tempdir().unwrap();
        let path = GeoTiffFixture::float32(2, 2, vec![100.0, 250.0, -9999.0, 400.0])
            .nodata(-9999.0)
            .resolution(30.0, 30.0)
            .epsg(32633)
            .write(dir.path().join("dem.tif"))
            .unwrap();

        let summary = summarize_dem(&path).unwrap();
        assert_eq!(summary.min, 100.0);
        assert_eq!(summary.max, 400.0);
        assert_eq!(summary.mean, 250.0);
        assert_eq!(summary.relief, 300.0);
        assert_eq!(summary.valid_pixel_count, 3);
        assert_eq!(summary.crs, Some(Crs::Epsg(32633)));
        assert_eq!(summary.resolution, (30.0, 30.0));
    }

    #[test]
    fn test_flat_dem_has_zero_relief() {
        let dir = tempfile::tempdir().unwrap();
        let path = GeoTiffFixture::float32(3, 1, vec![12.5; 3])
            .write(dir.path().join("flat.tif"))
            .unwrap();
        assert_eq!(summarize_dem(&path).unwrap().relief, 0.0);
    }

    #[test]
    fn test_errors() {
        let dir = tempfile::tempdir().unwrap();

        let empty = GeoTiffFixture::float32(2, 1, vec![-1.0, -1.0])
            .nodata(-1.0)
            .write(dir.path().join("empty.tif"))
            .unwrap();
        assert!(matches!(summarize_dem(&empty), Err(ZonalError::NoValidData)));

        let rgb = GeoTiffFixture::rgb8(2, 2).write(dir.path().join("rgb.tif")).unwrap();
        assert!(matches!(summarize_dem(&rgb), Err(ZonalError::MultiBand(3))));

        let bad = write_corrupt_raster(dir.path().join("bad.tif")).unwrap();
        assert!(matches!(summarize_dem(&bad), Err(ZonalError::Unreadable(_))));

        let huge = write_oversized_header(dir.path().join("huge.tif"), 100_000, 100_000).unwrap();
        assert!(matches!(summarize_dem(&huge), Err(ZonalError::Unreadable(_))));
    }

    #[test]
    fn test_decode_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = GeoTiffFixture::float64(2, 2, vec![1.0, 2.0, 3.0, 4.0])
            .write(dir.path().join("dem.tif"))
            .unwrap();
        assert!(matches!(
            summarize_dem_with_limit(&path, 31),
            Err(ZonalError::Unreadable(_))
        ));
        assert_eq!(summarize_dem_with_limit(&path, 32).unwrap().max, 4.0);
    }
}
