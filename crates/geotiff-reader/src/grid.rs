//! In-core pixel grid.

use crate::metadata::GeoTransform;

/// Whether a sample is a real measurement.
///
/// NaN is never a measurement. When a sentinel is declared, samples equal to
/// it are excluded as well.
#[inline]
pub fn is_valid_sample(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return false;
    }
    match nodata {
        Some(nd) => value != nd,
        None => true,
    }
}

/// A fully decoded single-band raster, samples widened to `f64`.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    /// Samples in row-major order, top row first.
    pub data: Vec<f64>,
    pub width: usize,
    pub height: usize,
    pub geotransform: GeoTransform,
    pub nodata: Option<f64>,
}

impl RasterGrid {
    pub fn new(
        data: Vec<f64>,
        width: usize,
        height: usize,
        geotransform: GeoTransform,
        nodata: Option<f64>,
    ) -> Self {
        Self {
            data,
            width,
            height,
            geotransform,
            nodata,
        }
    }

    /// Get the value at a specific grid coordinate.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Iterate over every sample that is not NoData/NaN.
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        let nodata = self.nodata;
        self.data
            .iter()
            .copied()
            .filter(move |v| is_valid_sample(*v, nodata))
    }

    pub fn has_valid_data(&self) -> bool {
        self.valid_values().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
