//! Bring a watershed into the CRS of a raster.

use std::borrow::Cow;

use geo::{Coord, MapCoords};
use projection::CoordTransformer;
use raster_common::Crs;
use tracing::{debug, warn};

use crate::error::Result;
use crate::watershed::Watershed;

/// Return the watershed expressed in `target`.
///
/// The input is borrowed unchanged when the CRS already match, when the
/// raster CRS is unknown, or when the watershed CRS is unknown (nothing to
/// transform from). Otherwise every vertex is transformed and a new
/// watershed is returned with `crs == Some(target)`.
///
/// # Errors
/// Returns [`ZonalError::Reprojection`](crate::ZonalError::Reprojection)
/// if either CRS is not supported or a vertex cannot be transformed.
pub fn reproject_if_needed<'a>(
    watershed: &'a Watershed,
    target: Option<&Crs>,
) -> Result<Cow<'a, Watershed>> {
    let Some(target) = target else {
        debug!("Raster has no CRS, using watershed coordinates as-is");
        return Ok(Cow::Borrowed(watershed));
    };

    let Some(source) = watershed.crs.as_ref() else {
        warn!(target = %target, "Watershed has no CRS, assuming it matches the raster");
        return Ok(Cow::Borrowed(watershed));
    };

    if source == target {
        return Ok(Cow::Borrowed(watershed));
    }

    let transformer = CoordTransformer::new(source, target)?;
    let geometry = watershed.geometry.try_map_coords(|c: Coord<f64>| {
        transformer
            .transform(c.x, c.y)
            .map(|(x, y)| Coord { x, y })
    })?;

    debug!(source = %source, target = %target, "Reprojected watershed");

    Ok(Cow::Owned(Watershed {
        geometry,
        crs: Some(target.clone()),
        attributes: watershed.attributes.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZonalError;
    use geo::{polygon, MultiPolygon};
    use test_utils::assert_approx_eq;

    fn square(crs: Option<Crs>) -> Watershed {
        let poly = polygon![
            (x: 14.0, y: 51.0),
            (x: 15.0, y: 51.0),
            (x: 15.0, y: 52.0),
            (x: 14.0, y: 52.0),
            (x: 14.0, y: 51.0),
        ];
        Watershed::new(MultiPolygon::new(vec![poly]), crs)
    }

    #[test]
    fn test_same_crs_is_borrowed() {
        let ws = square(Some(Crs::WGS84));
        let out = reproject_if_needed(&ws, Some(&Crs::WGS84)).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_unknown_crs_is_borrowed() {
        let ws = square(Some(Crs::WGS84));
        assert!(matches!(reproject_if_needed(&ws, None).unwrap(), Cow::Borrowed(_)));

        let ws = square(None);
        let out = reproject_if_needed(&ws, Some(&Crs::Epsg(32633))).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_reproject_to_utm() {
        let ws = square(Some(Crs::WGS84));
        let out = reproject_if_needed(&ws, Some(&Crs::Epsg(32633))).unwrap();
        assert_eq!(out.crs, Some(Crs::Epsg(32633)));

        // Zone 33 is centered on 15E, so the east edge sits at the false easting.
        let bbox = out.bounding_box().unwrap();
        assert_approx_eq!(bbox.max_x, 500_000.0, 1e-3);
        assert!(bbox.min_y > 5_600_000.0 && bbox.max_y < 5_800_000.0);
    }

    #[test]
    fn test_unsupported_target_fails() {
        let ws = square(Some(Crs::WGS84));
        let err = reproject_if_needed(&ws, Some(&Crs::Epsg(99999))).unwrap_err();
        assert!(matches!(err, ZonalError::Reprojection(_)));
    }
}
