//! Common types shared by the raster reader, the projection layer and the
//! zonal statistics core.

pub mod bbox;
pub mod crs;

pub use bbox::BoundingBox;
pub use crs::{Crs, CrsParseError};
