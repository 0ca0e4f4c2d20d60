//! Point transforms between two coordinate reference systems.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use raster_common::Crs;
use tracing::debug;

use crate::catalog::{is_geographic_definition, proj_string_for};
use crate::error::{ProjectionError, ProjectionResult};

/// Reusable transformer between two CRS (pure Rust, via proj4rs).
///
/// Geographic systems take and return degrees; the radian conversion the
/// projection engine needs happens inside [`CoordTransformer::transform`].
pub struct CoordTransformer {
    source_proj: Proj,
    target_proj: Proj,
    source: Crs,
    target: Crs,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl std::fmt::Debug for CoordTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordTransformer")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("source_is_geographic", &self.source_is_geographic)
            .field("target_is_geographic", &self.target_is_geographic)
            .finish_non_exhaustive()
    }
}

fn build(crs: &Crs) -> ProjectionResult<(Proj, bool)> {
    let def = proj_string_for(crs).ok_or_else(|| ProjectionError::UnsupportedCrs(crs.to_string()))?;
    let proj = Proj::from_proj_string(&def).map_err(|e| ProjectionError::InvalidDefinition {
        crs: crs.to_string(),
        message: format!("{e:?}"),
    })?;
    Ok((proj, is_geographic_definition(&def)))
}

impl CoordTransformer {
    /// Create a transformer between two CRS.
    ///
    /// # Errors
    /// Returns an error if either CRS has no known definition or the
    /// definition is rejected by the projection engine.
    pub fn new(source: &Crs, target: &Crs) -> ProjectionResult<Self> {
        let (source_proj, source_is_geographic) = build(source)?;
        let (target_proj, target_is_geographic) = build(target)?;
        debug!(source = %source, target = %target, "Created coordinate transformer");

        Ok(Self {
            source_proj,
            target_proj,
            source: source.clone(),
            target: target.clone(),
            source_is_geographic,
            target_is_geographic,
        })
    }

    pub fn source(&self) -> &Crs {
        &self.source
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    /// Transform one coordinate from source CRS to target CRS.
    ///
    /// # Errors
    /// Returns an error if the engine rejects the point or produces a
    /// non-finite result (e.g. a point outside the projection's domain).
    #[inline]
    pub fn transform(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        let (in_x, in_y) = if self.source_is_geographic {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (in_x, in_y, 0.0);
        transform(&self.source_proj, &self.target_proj, &mut point).map_err(|e| {
            ProjectionError::TransformFailed {
                x,
                y,
                message: format!("{e:?}"),
            }
        })?;

        let (out_x, out_y) = if self.target_is_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(ProjectionError::TransformFailed {
                x,
                y,
                message: "non-finite result".to_string(),
            });
        }

        Ok((out_x, out_y))
    }
}
