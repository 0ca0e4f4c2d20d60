//! Raster metadata types.

use raster_common::{BoundingBox, Crs};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric kind of the stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelDtype {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl PixelDtype {
    /// Map a TIFF `SampleFormat` / `BitsPerSample` pair to a dtype.
    ///
    /// Sample format 1 is unsigned integer, 2 is signed integer, 3 is IEEE
    /// floating point. A missing SampleFormat tag means unsigned.
    pub fn from_tiff(sample_format: u16, bits: u16) -> Option<Self> {
        match (sample_format, bits) {
            (1, 8) => Some(Self::U8),
            (1, 16) => Some(Self::U16),
            (1, 32) => Some(Self::U32),
            (1, 64) => Some(Self::U64),
            (2, 8) => Some(Self::I8),
            (2, 16) => Some(Self::I16),
            (2, 32) => Some(Self::I32),
            (2, 64) => Some(Self::I64),
            (3, 32) => Some(Self::F32),
            (3, 64) => Some(Self::F64),
            _ => None,
        }
    }

    /// Whether rainfall products are normally delivered in this kind.
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            Self::F32 | Self::F64 | Self::I16 | Self::I32 | Self::U16 | Self::U32
        )
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::I8 => "int8",
            Self::U16 => "uint16",
            Self::I16 => "int16",
            Self::U32 => "uint32",
            Self::I32 => "int32",
            Self::U64 => "uint64",
            Self::I64 => "int64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

impl fmt::Display for PixelDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Affine pixel-to-world transform, GDAL ordering:
/// `x = gt[0] + col * gt[1] + row * gt[2]`,
/// `y = gt[3] + col * gt[4] + row * gt[5]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// Transform used when a file carries no georeferencing: pixel space.
    pub const IDENTITY: GeoTransform = GeoTransform([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// North-up transform from an upper-left origin and positive pixel sizes.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([origin_x, pixel_width, 0.0, origin_y, 0.0, -pixel_height])
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.0[0], self.0[3])
    }

    /// Absolute pixel size (x, y).
    pub fn resolution(&self) -> (f64, f64) {
        let gt = &self.0;
        (gt[1].hypot(gt[4]), gt[2].hypot(gt[5]))
    }

    pub fn is_rotated(&self) -> bool {
        self.0[2] != 0.0 || self.0[4] != 0.0
    }

    /// World coordinates of a fractional pixel position.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let gt = &self.0;
        (
            gt[0] + col * gt[1] + row * gt[2],
            gt[3] + col * gt[4] + row * gt[5],
        )
    }

    /// World coordinates of the center of cell (col, row).
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional pixel position of a world coordinate, or `None` for a
    /// degenerate transform.
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let gt = &self.0;
        let det = gt[1] * gt[5] - gt[2] * gt[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - gt[0];
        let dy = y - gt[3];
        let col = (gt[5] * dx - gt[2] * dy) / det;
        let row = (gt[1] * dy - gt[4] * dx) / det;
        Some((col, row))
    }

    /// World extent covered by a `width` x `height` grid.
    pub fn extent(&self, width: usize, height: usize) -> BoundingBox {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(width as f64, 0.0),
            self.apply(0.0, height as f64),
            self.apply(width as f64, height as f64),
        ];
        let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for (x, y) in corners {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        bbox
    }
}

/// Descriptive metadata of a single raster file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    pub band_count: usize,
    pub width: usize,
    pub height: usize,
    /// `None` when the file declares no coordinate reference at all.
    pub crs: Option<Crs>,
    /// Declared NoData sentinel. For float32 rasters this is already rounded
    /// to float32 precision so it compares equal to decoded samples.
    pub nodata: Option<f64>,
    pub pixel_dtype: PixelDtype,
    /// Absolute pixel size (x, y).
    pub resolution: (f64, f64),
    pub geotransform: GeoTransform,
}

impl RasterMetadata {
    pub fn extent(&self) -> BoundingBox {
        self.geotransform.extent(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_from_tiff() {
        assert_eq!(PixelDtype::from_tiff(3, 32), Some(PixelDtype::F32));
        assert_eq!(PixelDtype::from_tiff(2, 16), Some(PixelDtype::I16));
        assert_eq!(PixelDtype::from_tiff(1, 8), Some(PixelDtype::U8));
        assert_eq!(PixelDtype::from_tiff(3, 16), None);
        assert_eq!(PixelDtype::from_tiff(1, 12), None);
    }

    #[test]
    fn test_accepted_dtypes() {
        for dtype in [
            PixelDtype::F32,
            PixelDtype::F64,
            PixelDtype::I16,
            PixelDtype::I32,
            PixelDtype::U16,
            PixelDtype::U32,
        ] {
            assert!(dtype.is_accepted(), "{} should be accepted", dtype);
        }
        for dtype in [PixelDtype::U8, PixelDtype::I8, PixelDtype::U64, PixelDtype::I64] {
            assert!(!dtype.is_accepted(), "{} should not be accepted", dtype);
        }
    }

    #[test]
    fn test_north_up_cell_center() {
        let gt = GeoTransform::north_up(100.0, 50.0, 0.5, 0.25);
        assert_eq!(gt.cell_center(0, 0), (100.25, 49.875));
        assert_eq!(gt.cell_center(2, 4), (101.25, 48.875));
        assert_eq!(gt.resolution(), (0.5, 0.25));
        assert!(!gt.is_rotated());
    }

    #[test]
    fn test_invert_roundtrips_cell_centers() {
        let gt = GeoTransform::north_up(-120.0, 45.0, 0.1, 0.1);
        let (x, y) = gt.cell_center(7, 3);
        let (col, row) = gt.invert(x, y).unwrap();
        assert!((col - 7.5).abs() < 1e-9);
        assert!((row - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_transform_has_no_inverse() {
        let gt = GeoTransform([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(gt.invert(1.0, 1.0).is_none());
    }

    #[test]
    fn test_extent() {
        let gt = GeoTransform::north_up(0.0, 3.0, 1.0, 1.0);
        assert_eq!(gt.extent(3, 3), BoundingBox::new(0.0, 0.0, 3.0, 3.0));
    }
}
