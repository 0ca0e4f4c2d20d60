//! Error types for zonal statistics.

use geotiff_reader::GeoTiffError;
use projection::ProjectionError;
use thiserror::Error;

/// Errors that can occur while validating, reprojecting or aggregating.
///
/// Inside the batch pipeline these never escape: each one is turned into a
/// [`SkipRecord`](crate::SkipRecord) for the raster that raised it.
#[derive(Error, Debug)]
pub enum ZonalError {
    /// The raster could not be opened or decoded.
    #[error("unreadable: {0}")]
    Unreadable(String),

    /// The raster has more than one band.
    #[error("multi-band ({0} bands)")]
    MultiBand(usize),

    /// Every cell is NoData or NaN.
    #[error("no valid data")]
    NoValidData,

    /// The watershed could not be transformed into the raster CRS.
    #[error("reprojection failed: {0}")]
    Reprojection(#[from] ProjectionError),

    /// Reading or computing statistics failed.
    #[error("aggregation failed: {0}")]
    Aggregation(String),

    /// The watershed layer is not usable GeoJSON.
    #[error("invalid watershed layer: {0}")]
    InvalidLayer(String),

    /// No feature has the requested attribute value.
    #[error("no region with {column} = {value}")]
    RegionNotFound { column: String, value: String },

    /// More than one feature has the requested attribute value.
    #[error("{count} regions match {column} = {value}, expected exactly one")]
    AmbiguousRegion {
        column: String,
        value: String,
        count: usize,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage/IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZonalError {
    /// Create an Aggregation error.
    pub fn aggregation(msg: impl Into<String>) -> Self {
        Self::Aggregation(msg.into())
    }

    /// Create an InvalidLayer error.
    pub fn invalid_layer(msg: impl Into<String>) -> Self {
        Self::InvalidLayer(msg.into())
    }
}

impl From<GeoTiffError> for ZonalError {
    fn from(err: GeoTiffError) -> Self {
        match err {
            GeoTiffError::MultiBand(n) => Self::MultiBand(n),
            other => Self::Unreadable(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ZonalError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidLayer(err.to_string())
    }
}

/// Result type for zonal statistics operations.
pub type Result<T> = std::result::Result<T, ZonalError>;
