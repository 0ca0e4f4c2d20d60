//! Coordinate Reference System identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque coordinate reference identifier as declared by a raster or a
/// vector layer.
///
/// Rasters that carry an EPSG code in their GeoKey directory map to
/// [`Crs::Epsg`]. Anything else (a user-defined projection, a bare citation
/// string) is kept verbatim as [`Crs::UserDefined`] so it can still be
/// compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    Epsg(u32),
    UserDefined(String),
}

impl Crs {
    /// WGS84 geographic, the GeoJSON default.
    pub const WGS84: Crs = Crs::Epsg(4326);

    /// Parse a CRS reference string.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:4326"
    /// - "urn:ogc:def:crs:EPSG::4326"
    /// - "CRS:84" / "urn:ogc:def:crs:OGC:1.3:CRS84" (treated as EPSG:4326)
    /// - "4326"
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CrsParseError::Empty);
        }

        let upper = trimmed.to_uppercase();
        if upper == "CRS:84" || upper.ends_with(":CRS84") {
            return Ok(Crs::WGS84);
        }

        let code = if let Some(rest) = upper.strip_prefix("EPSG:") {
            rest
        } else if let Some(rest) = upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:") {
            // Optional version segment: "EPSG::4326" or "EPSG:6.6:4326"
            rest.rsplit(':').next().unwrap_or(rest)
        } else {
            upper.as_str()
        };

        code.parse::<u32>()
            .map(Crs::Epsg)
            .map_err(|_| CrsParseError::Unsupported(trimmed.to_string()))
    }

    /// EPSG code, if this CRS has one.
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::UserDefined(_) => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::UserDefined(citation) => write!(f, "{}", citation),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Empty CRS reference")]
    Empty,

    #[error("Unsupported CRS: {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::Epsg(4326));
        assert_eq!(Crs::parse("epsg:32633").unwrap(), Crs::Epsg(32633));
        assert_eq!(Crs::parse("CRS:84").unwrap(), Crs::WGS84);
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:EPSG::26910").unwrap(),
            Crs::Epsg(26910)
        );
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            Crs::WGS84
        );
        assert_eq!(Crs::parse(" 3857 ").unwrap(), Crs::Epsg(3857));
        assert!(Crs::parse("").is_err());
        assert!(Crs::parse("EPSG:abc").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Crs::Epsg(4326).to_string(), "EPSG:4326");
        assert_eq!(Crs::UserDefined("Custom LCC".into()).to_string(), "Custom LCC");
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(Crs::Epsg(4326), Crs::WGS84);
        assert_ne!(Crs::Epsg(4326), Crs::Epsg(4269));
        assert_ne!(Crs::Epsg(4326), Crs::UserDefined("EPSG:4326".into()));
    }

    #[test]
    fn test_serde_roundtrip_shape() {
        let json = serde_json::to_string(&Crs::Epsg(32610)).unwrap();
        assert_eq!(json, r#"{"epsg":32610}"#);
    }
}
