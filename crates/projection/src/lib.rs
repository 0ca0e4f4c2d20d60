//! Coordinate reference system transformations.
//!
//! Maps CRS identifiers to proj definitions and transforms points between
//! them with `proj4rs`, so no PROJ system library is required.

pub mod catalog;
pub mod error;
pub mod transformer;

pub use catalog::{proj_string_for, proj_string_for_epsg};
pub use error::{ProjectionError, ProjectionResult};
pub use transformer::CoordTransformer;
