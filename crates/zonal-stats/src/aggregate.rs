//! Zonal statistics over the cells whose center falls inside a polygon.
//!
//! The polygon bounding box is clipped to the raster extent and mapped into
//! pixel space first so only the covering window of the raster is tested.
//! A cell center on the polygon boundary counts as inside.

use std::path::Path;

use geo::{Intersects, MultiPolygon, Point};
use geotiff_reader::{is_valid_sample, read_raster, RasterGrid};
use raster_common::BoundingBox;
use tracing::trace;

use crate::error::{Result, ZonalError};
use crate::types::ZonalStats;
use crate::watershed::Watershed;

/// Aggregate the valid cells of the raster at `path` inside `watershed`.
///
/// `nodata` overrides the sentinel declared in the file. The watershed must
/// already be in the raster CRS.
pub fn aggregate(
    watershed: &Watershed,
    path: impl AsRef<Path>,
    nodata: Option<f64>,
) -> Result<ZonalStats> {
    let (_, grid) = read_raster(path.as_ref())?;
    aggregate_grid(&watershed.geometry, &grid, nodata)
}

/// Aggregate an already-decoded grid.
///
/// A polygon that misses the raster yields [`ZonalStats::default`] (all
/// zeros), not an error.
pub fn aggregate_grid(
    geometry: &MultiPolygon<f64>,
    grid: &RasterGrid,
    nodata: Option<f64>,
) -> Result<ZonalStats> {
    if grid.data.len() != grid.width * grid.height {
        return Err(ZonalError::aggregation(format!(
            "grid holds {} samples, expected {}x{}",
            grid.data.len(),
            grid.width,
            grid.height
        )));
    }

    let Some(window) = pixel_window(geometry, grid) else {
        return Ok(ZonalStats::default());
    };

    let (col_range, row_range) = window;
    trace!(?col_range, ?row_range, "Aggregation window");

    let values = row_range.flat_map(|row| {
        col_range.clone().filter_map(move |col| {
            let value = grid.data[row * grid.width + col];
            if !is_valid_sample(value, nodata) {
                return None;
            }
            let (x, y) = grid.geotransform.cell_center(col, row);
            geometry.intersects(&Point::new(x, y)).then_some(value)
        })
    });

    Ok(ZonalStats::from_values(values))
}

type Window = (std::ops::Range<usize>, std::ops::Range<usize>);

/// Pixel ranges covering the part of the polygon's bounding box that lies
/// inside the raster extent. `None` when the two do not overlap.
fn pixel_window(geometry: &MultiPolygon<f64>, grid: &RasterGrid) -> Option<Window> {
    use geo::BoundingRect;

    if grid.width == 0 || grid.height == 0 {
        return None;
    }
    let rect = geometry.bounding_rect()?;
    let zone = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
    let extent = grid.geotransform.extent(grid.width, grid.height);
    let Some(clip) = extent.intersection(&zone) else {
        trace!(?extent, ?zone, "Polygon outside raster extent");
        return None;
    };

    let corners = [
        (clip.min_x, clip.min_y),
        (clip.max_x, clip.min_y),
        (clip.max_x, clip.max_y),
        (clip.min_x, clip.max_y),
    ];

    let mut pixels = Vec::with_capacity(corners.len());
    for (x, y) in corners {
        match grid.geotransform.invert(x, y) {
            Some(p) => pixels.push(p),
            // Degenerate transform: test every cell.
            None => return Some((0..grid.width, 0..grid.height)),
        }
    }

    let col_min = pixels.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let col_max = pixels.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let row_min = pixels.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let row_max = pixels.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    let cols = clamp_range(col_min, col_max, grid.width)?;
    let rows = clamp_range(row_min, row_max, grid.height)?;
    Some((cols, rows))
}

fn clamp_range(lo: f64, hi: f64, len: usize) -> Option<std::ops::Range<usize>> {
    if !lo.is_finite() || !hi.is_finite() || hi < 0.0 || lo > len as f64 {
        return None;
    }
    let start = lo.floor().max(0.0) as usize;
    let end = (hi.ceil().max(0.0) as usize).min(len);
    (start < end).then_some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use geotiff_reader::GeoTransform;

    /// 3x3 grid covering [0, 3] x [0, 3] with values 1..=9, row 0 at the top.
    fn sequence_grid(nodata: Option<f64>) -> RasterGrid {
        RasterGrid::new(
            (1..=9).map(f64::from).collect(),
            3,
            3,
            GeoTransform::north_up(0.0, 3.0, 1.0, 1.0),
            nodata,
        )
    }

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: min_x, y: min_y),
            (x: max_x, y: min_y),
            (x: max_x, y: max_y),
            (x: min_x, y: max_y),
            (x: min_x, y: min_y),
        ]])
    }

    #[test]
    fn test_full_cover() {
        let stats = aggregate_grid(&rect(0.0, 0.0, 3.0, 3.0), &sequence_grid(None), None).unwrap();
        assert_eq!(stats.sum, 45.0);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.count, 9);
    }

    #[test]
    fn test_partial_cover_uses_cell_centers() {
        // Covers the centers of the two left columns only.
        let stats = aggregate_grid(&rect(0.0, 0.0, 1.9, 3.0), &sequence_grid(None), None).unwrap();
        assert_eq!(stats.count, 6);
        assert_eq!(stats.sum, 1.0 + 2.0 + 4.0 + 5.0 + 7.0 + 8.0);
    }

    #[test]
    fn test_nodata_excluded() {
        let mut grid = sequence_grid(Some(-9999.0));
        grid.data[4] = -9999.0;
        let stats = aggregate_grid(&rect(0.0, 0.0, 3.0, 3.0), &grid, Some(-9999.0)).unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.sum, 40.0);
        assert_eq!(stats.mean, 5.0);
    }

    #[test]
    fn test_nan_always_excluded() {
        let mut grid = sequence_grid(None);
        grid.data[0] = f64::NAN;
        let stats = aggregate_grid(&rect(0.0, 0.0, 3.0, 3.0), &grid, None).unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.sum, 44.0);
    }

    #[test]
    fn test_disjoint_polygon_is_zero() {
        let stats =
            aggregate_grid(&rect(100.0, 100.0, 110.0, 110.0), &sequence_grid(None), None).unwrap();
        assert_eq!(stats, ZonalStats::default());
    }

    #[test]
    fn test_polygon_overhanging_extent_is_clipped() {
        // Only the bottom-left cell center (0.5, 0.5) lies inside.
        let stats =
            aggregate_grid(&rect(-50.0, -50.0, 1.2, 1.2), &sequence_grid(None), None).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.sum, 7.0);
    }

    #[test]
    fn test_polygon_touching_extent_edge_is_zero() {
        let stats = aggregate_grid(&rect(3.0, 0.0, 5.0, 3.0), &sequence_grid(None), None).unwrap();
        assert_eq!(stats, ZonalStats::default());
    }

    #[test]
    fn test_polygon_between_centers_is_zero() {
        let stats = aggregate_grid(&rect(0.1, 0.1, 0.4, 0.4), &sequence_grid(None), None).unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.sum, 0.0);
    }

    #[test]
    fn test_concave_polygon() {
        // L-shape over the bottom row and left column.
        let geometry = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 3.0, y: 0.0),
            (x: 3.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 3.0),
            (x: 0.0, y: 3.0),
            (x: 0.0, y: 0.0),
        ]]);
        let stats = aggregate_grid(&geometry, &sequence_grid(None), None).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.sum, 1.0 + 4.0 + 7.0 + 8.0 + 9.0);
    }

    #[test]
    fn test_malformed_grid_is_error() {
        let mut grid = sequence_grid(None);
        grid.data.pop();
        let err = aggregate_grid(&rect(0.0, 0.0, 3.0, 3.0), &grid, None).unwrap_err();
        assert!(matches!(err, ZonalError::Aggregation(_)));
    }
}
