//! Error types for coordinate transforms.

use thiserror::Error;

/// Result type for projection operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Error, Debug)]
pub enum ProjectionError {
    /// No proj definition is known for this CRS.
    #[error("unsupported CRS: {0}")]
    UnsupportedCrs(String),

    /// The proj definition was rejected by the projection engine.
    #[error("invalid projection definition for {crs}: {message}")]
    InvalidDefinition { crs: String, message: String },

    /// A point could not be transformed.
    #[error("transform of ({x}, {y}) failed: {message}")]
    TransformFailed { x: f64, y: f64, message: String },
}
