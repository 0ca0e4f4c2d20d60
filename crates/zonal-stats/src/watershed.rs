//! Watershed boundary layers loaded from GeoJSON.
//!
//! A layer is a FeatureCollection of Polygon/MultiPolygon features. The
//! optional legacy `crs` member names the layer CRS; without it GeoJSON
//! coordinates are WGS84 longitude/latitude.

use std::collections::BTreeSet;
use std::path::Path;

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use raster_common::{BoundingBox, Crs};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, ZonalError};

/// One watershed polygon with its attributes and CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct Watershed {
    pub geometry: MultiPolygon<f64>,
    /// `None` when the CRS is unknown.
    pub crs: Option<Crs>,
    pub attributes: Map<String, Value>,
}

impl Watershed {
    pub fn new(geometry: MultiPolygon<f64>, crs: Option<Crs>) -> Self {
        Self {
            geometry,
            crs,
            attributes: Map::new(),
        }
    }

    /// Axis-aligned bounds of the geometry, or `None` if it is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geometry
            .bounding_rect()
            .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }

    /// Attribute value rendered as text, if present.
    pub fn attribute(&self, column: &str) -> Option<String> {
        self.attributes.get(column).and_then(attribute_text)
    }
}

/// All features of a watershed layer.
#[derive(Debug, Clone, PartialEq)]
pub struct WatershedLayer {
    pub crs: Option<Crs>,
    features: Vec<Watershed>,
}

#[derive(Deserialize)]
struct FeatureCollectionDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<FeatureDoc>,
    crs: Option<NamedCrsDoc>,
}

#[derive(Deserialize)]
struct NamedCrsDoc {
    properties: NamedCrsProperties,
}

#[derive(Deserialize)]
struct NamedCrsProperties {
    name: String,
}

#[derive(Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<GeometryDoc>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum GeometryDoc {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

impl WatershedLayer {
    pub fn new(crs: Option<Crs>, features: Vec<Watershed>) -> Self {
        Self { crs, features }
    }

    /// Parse a GeoJSON FeatureCollection from text.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let doc: FeatureCollectionDoc = serde_json::from_str(text)?;
        Self::from_doc(doc)
    }

    /// Parse a GeoJSON FeatureCollection from raw file bytes.
    pub fn from_geojson(bytes: &[u8]) -> Result<Self> {
        let doc: FeatureCollectionDoc = serde_json::from_slice(bytes)?;
        Self::from_doc(doc)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_geojson(&bytes)
    }

    fn from_doc(doc: FeatureCollectionDoc) -> Result<Self> {
        if doc.kind != "FeatureCollection" {
            return Err(ZonalError::invalid_layer(format!(
                "expected a FeatureCollection, found {}",
                doc.kind
            )));
        }

        let crs = match doc.crs {
            Some(named) => Some(
                Crs::parse(&named.properties.name)
                    .map_err(|e| ZonalError::invalid_layer(e.to_string()))?,
            ),
            None => Some(Crs::WGS84),
        };

        let mut features = Vec::with_capacity(doc.features.len());
        for (index, feature) in doc.features.into_iter().enumerate() {
            let geometry = match feature.geometry {
                Some(GeometryDoc::Polygon { coordinates }) => {
                    MultiPolygon::new(vec![build_polygon(&coordinates, index)?])
                }
                Some(GeometryDoc::MultiPolygon { coordinates }) => MultiPolygon::new(
                    coordinates
                        .iter()
                        .map(|rings| build_polygon(rings, index))
                        .collect::<Result<Vec<_>>>()?,
                ),
                Some(GeometryDoc::Unsupported) => {
                    return Err(ZonalError::invalid_layer(format!(
                        "feature {} is not a Polygon or MultiPolygon",
                        index
                    )));
                }
                None => {
                    warn!(feature = index, "Skipping feature without geometry");
                    continue;
                }
            };

            features.push(Watershed {
                geometry,
                crs: crs.clone(),
                attributes: feature.properties.unwrap_or_default(),
            });
        }

        debug!(features = features.len(), crs = ?crs, "Loaded watershed layer");
        Ok(Self { crs, features })
    }

    pub fn features(&self) -> &[Watershed] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Attribute names present on any feature, sorted.
    pub fn attribute_columns(&self) -> Vec<String> {
        let columns: BTreeSet<&String> = self
            .features
            .iter()
            .flat_map(|f| f.attributes.keys())
            .collect();
        columns.into_iter().cloned().collect()
    }

    /// Distinct values of `column`, sorted, for building a region picker.
    pub fn attribute_values(&self, column: &str) -> Vec<String> {
        let values: BTreeSet<String> = self
            .features
            .iter()
            .filter_map(|f| f.attribute(column))
            .collect();
        values.into_iter().collect()
    }

    /// The single feature whose `column` equals `value`.
    pub fn select(&self, column: &str, value: &str) -> Result<Watershed> {
        let mut matches = self
            .features
            .iter()
            .filter(|f| f.attribute(column).as_deref() == Some(value));

        let Some(first) = matches.next() else {
            return Err(ZonalError::RegionNotFound {
                column: column.to_string(),
                value: value.to_string(),
            });
        };

        let extra = matches.count();
        if extra > 0 {
            return Err(ZonalError::AmbiguousRegion {
                column: column.to_string(),
                value: value.to_string(),
                count: extra + 1,
            });
        }

        Ok(first.clone())
    }
}

fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn build_ring(positions: &[Vec<f64>], feature: usize) -> Result<LineString<f64>> {
    let coords = positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(ZonalError::invalid_layer(format!(
                "feature {} has a position with fewer than two coordinates",
                feature
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    if coords.len() < 4 {
        return Err(ZonalError::invalid_layer(format!(
            "feature {} has a ring with fewer than four positions",
            feature
        )));
    }

    Ok(LineString::new(coords))
}

fn build_polygon(rings: &[Vec<Vec<f64>>], feature: usize) -> Result<Polygon<f64>> {
    let Some((outer, holes)) = rings.split_first() else {
        return Err(ZonalError::invalid_layer(format!(
            "feature {} has a polygon without rings",
            feature
        )));
    };
    let exterior = build_ring(outer, feature)?;
    let interiors = holes
        .iter()
        .map(|ring| build_ring(ring, feature))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_utils::{rectangle_ring, watershed_geojson};

    fn layer() -> WatershedLayer {
        let text = watershed_geojson(
            &[
                (json!({"NAME": "Upper", "ID": 1}), rectangle_ring(0.0, 0.0, 1.0, 1.0)),
                (json!({"NAME": "Lower", "ID": 2}), rectangle_ring(1.0, 0.0, 2.0, 1.0)),
                (json!({"NAME": "Lower", "ID": 3}), rectangle_ring(2.0, 0.0, 3.0, 1.0)),
            ],
            None,
        );
        WatershedLayer::from_geojson_str(&text).unwrap()
    }

    #[test]
    fn test_default_crs_is_wgs84() {
        let layer = layer();
        assert_eq!(layer.len(), 3);
        assert_eq!(layer.crs, Some(Crs::WGS84));
        assert_eq!(layer.features()[0].crs, Some(Crs::WGS84));
    }

    #[test]
    fn test_named_crs() {
        let text = watershed_geojson(
            &[(json!({"NAME": "A"}), rectangle_ring(0.0, 0.0, 10.0, 10.0))],
            Some("urn:ogc:def:crs:EPSG::32633"),
        );
        let layer = WatershedLayer::from_geojson_str(&text).unwrap();
        assert_eq!(layer.crs, Some(Crs::Epsg(32633)));
    }

    #[test]
    fn test_attribute_values_and_columns() {
        let layer = layer();
        assert_eq!(layer.attribute_columns(), vec!["ID", "NAME"]);
        assert_eq!(layer.attribute_values("NAME"), vec!["Lower", "Upper"]);
        assert_eq!(layer.attribute_values("ID"), vec!["1", "2", "3"]);
        assert!(layer.attribute_values("MISSING").is_empty());
    }

    #[test]
    fn test_select() {
        let layer = layer();
        let upper = layer.select("NAME", "Upper").unwrap();
        assert_eq!(upper.attribute("ID").as_deref(), Some("1"));
        let bbox = upper.bounding_box().unwrap();
        assert_eq!((bbox.min_x, bbox.max_x), (0.0, 1.0));

        let by_id = layer.select("ID", "3").unwrap();
        assert_eq!(by_id.attribute("NAME").as_deref(), Some("Lower"));
    }

    #[test]
    fn test_select_errors() {
        let layer = layer();
        assert!(matches!(
            layer.select("NAME", "Nowhere"),
            Err(ZonalError::RegionNotFound { .. })
        ));
        assert!(matches!(
            layer.select("NAME", "Lower"),
            Err(ZonalError::AmbiguousRegion { count: 2, .. })
        ));
    }

    #[test]
    fn test_multipolygon_with_hole_and_z() {
        let text = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"NAME": "Basin"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[
                        [[0, 0, 5], [4, 0, 5], [4, 4, 5], [0, 4, 5], [0, 0, 5]],
                        [[1, 1], [2, 1], [2, 2], [1, 2], [1, 1]]
                    ]]
                }
            }]
        })
        .to_string();
        let layer = WatershedLayer::from_geojson_str(&text).unwrap();
        let basin = &layer.features()[0];
        assert_eq!(basin.geometry.0.len(), 1);
        assert_eq!(basin.geometry.0[0].interiors().len(), 1);
    }

    #[test]
    fn test_rejects_non_polygon_and_non_collection() {
        let point = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [0, 0]}}]
        })
        .to_string();
        assert!(matches!(
            WatershedLayer::from_geojson_str(&point),
            Err(ZonalError::InvalidLayer(_))
        ));

        let feature = json!({"type": "Feature", "properties": {}, "geometry": null}).to_string();
        assert!(WatershedLayer::from_geojson_str(&feature).is_err());
        assert!(WatershedLayer::from_geojson_str("not json").is_err());
    }

    #[test]
    fn test_null_geometry_is_skipped() {
        let text = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"NAME": "Ghost"}, "geometry": null}]
        })
        .to_string();
        let layer = WatershedLayer::from_geojson_str(&text).unwrap();
        assert!(layer.is_empty());
    }
}
