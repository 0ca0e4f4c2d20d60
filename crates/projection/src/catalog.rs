//! Proj definitions for the EPSG codes rainfall products and watershed
//! boundaries are commonly delivered in.

use std::borrow::Cow;

use raster_common::Crs;

/// Proj string for an EPSG code, if the code is in the catalogue.
pub fn proj_string_for_epsg(code: u32) -> Option<Cow<'static, str>> {
    let fixed = match code {
        4326 => Some("+proj=longlat +datum=WGS84 +no_defs"),
        4269 => Some("+proj=longlat +datum=NAD83 +no_defs"),
        4258 => Some("+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs"),
        3857 | 900913 => Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
        ),
        5070 => Some(
            "+proj=aea +lat_0=23 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs",
        ),
        3035 => Some(
            "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
        ),
        _ => None,
    };
    if let Some(def) = fixed {
        return Some(Cow::Borrowed(def));
    }

    // UTM families
    let utm = match code {
        32601..=32660 => Some((code - 32600, false, "+datum=WGS84")),
        32701..=32760 => Some((code - 32700, true, "+datum=WGS84")),
        26901..=26923 => Some((code - 26900, false, "+datum=NAD83")),
        25828..=25838 => Some((code - 25800, false, "+ellps=GRS80 +towgs84=0,0,0,0,0,0,0")),
        _ => None,
    };
    utm.map(|(zone, south, datum)| {
        let south = if south { " +south" } else { "" };
        Cow::Owned(format!(
            "+proj=utm +zone={}{} {} +units=m +no_defs",
            zone, south, datum
        ))
    })
}

/// Proj string for any CRS identifier.
///
/// User-defined systems are accepted when their citation is itself a proj
/// string; anything else is unknown.
pub fn proj_string_for(crs: &Crs) -> Option<Cow<'_, str>> {
    match crs {
        Crs::Epsg(code) => proj_string_for_epsg(*code),
        Crs::UserDefined(text) => {
            let text = text.trim();
            text.starts_with("+proj=").then_some(Cow::Borrowed(text))
        }
    }
}

/// Whether a proj definition describes a lon/lat system.
pub fn is_geographic_definition(def: &str) -> bool {
    def.split_whitespace()
        .any(|token| token == "+proj=longlat" || token == "+proj=latlong")
}
