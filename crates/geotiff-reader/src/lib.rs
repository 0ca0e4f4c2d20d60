//! Single-band GeoTIFF reader.
//!
//! Decodes GeoTIFF rasters (monthly rainfall grids, DEMs) into an in-core
//! `f64` grid together with the metadata the zonal statistics core needs:
//! band count, dimensions, CRS, NoData sentinel, sample type and the affine
//! geotransform.
//!
//! Georeferencing is read from the standard GeoTIFF tags:
//!
//! - `ModelTransformation` (34264), or `ModelPixelScale` (33550) together
//!   with `ModelTiepoint` (33922)
//! - `GeoKeyDirectory` (34735) / `GeoAsciiParams` (34737) for the CRS
//! - `GDAL_NODATA` (42113) for the NoData sentinel
//!
//! Decoding is pure Rust (the `tiff` crate); no GDAL installation is needed.
//!
//! # Example
//!
//! ```ignore
//! use geotiff_reader::GeoTiffReader;
//!
//! let mut reader = GeoTiffReader::open("rain/01-2020.tif")?;
//! let metadata = reader.metadata()?;
//! let grid = reader.read_grid(&metadata)?;
//! println!("{} valid cells", grid.valid_values().count());
//! ```

pub mod error;
pub mod geokeys;
pub mod grid;
pub mod metadata;
pub mod reader;

pub use error::{GeoTiffError, GeoTiffResult};
pub use grid::{is_valid_sample, RasterGrid};
pub use metadata::{GeoTransform, PixelDtype, RasterMetadata};
pub use reader::{GeoTiffReader, DEFAULT_MAX_DECODE_BYTES};

use std::path::Path;

/// Open a file and decode both its metadata and full pixel grid.
pub fn read_raster(path: impl AsRef<Path>) -> GeoTiffResult<(RasterMetadata, RasterGrid)> {
    let mut reader = GeoTiffReader::open(path)?;
    let metadata = reader.metadata()?;
    let grid = reader.read_grid(&metadata)?;
    Ok((metadata, grid))
}
