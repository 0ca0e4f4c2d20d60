//! Error types for GeoTIFF reading operations.

use thiserror::Error;

/// Result type for GeoTIFF reader operations.
pub type GeoTiffResult<T> = Result<T, GeoTiffError>;

/// Error types for GeoTIFF reading.
#[derive(Error, Debug)]
pub enum GeoTiffError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF container or codec error
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The file holds more than one band where a single band is required
    #[error("raster has {0} bands, expected 1")]
    MultiBand(usize),

    /// Zero-sized image
    #[error("invalid raster dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// Malformed ModelPixelScale / ModelTiepoint / ModelTransformation tags
    #[error("invalid georeference: {0}")]
    InvalidGeoreference(String),

    /// Declared dimensions exceed the decode ceiling
    #[error("raster needs {bytes} bytes to decode, limit is {limit}")]
    TooLarge { bytes: usize, limit: usize },

    /// Sample layout the reader cannot turn into a numeric grid
    #[error("unsupported sample layout: {0}")]
    UnsupportedLayout(String),
}
