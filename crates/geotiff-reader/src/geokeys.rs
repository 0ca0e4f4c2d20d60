//! GeoTIFF tag numbers and GeoKey directory decoding.
//!
//! The GeoKey directory is a `u16` array: a 4-entry header
//! `[version, revision, minor, key_count]` followed by `key_count` entries of
//! `[key_id, tag_location, count, value_or_offset]`. A `tag_location` of 0
//! means the value is stored inline; otherwise it names the TIFF tag
//! (GeoDoubleParams / GeoAsciiParams) holding the value at `value_or_offset`.

use raster_common::Crs;

pub const MODEL_PIXEL_SCALE: u16 = 33550;
pub const MODEL_TIEPOINT: u16 = 33922;
pub const MODEL_TRANSFORMATION: u16 = 34264;
pub const GEO_KEY_DIRECTORY: u16 = 34735;
pub const GEO_DOUBLE_PARAMS: u16 = 34736;
pub const GEO_ASCII_PARAMS: u16 = 34737;
pub const GDAL_NODATA: u16 = 42113;

pub const GT_MODEL_TYPE: u16 = 1024;
pub const GT_RASTER_TYPE: u16 = 1025;
pub const GT_CITATION: u16 = 1026;
pub const GEOGRAPHIC_TYPE: u16 = 2048;
pub const GEOG_CITATION: u16 = 2049;
pub const PROJECTED_CS_TYPE: u16 = 3072;
pub const PCS_CITATION: u16 = 3073;

pub const MODEL_TYPE_PROJECTED: u16 = 1;
pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
pub const RASTER_PIXEL_IS_AREA: u16 = 1;
pub const RASTER_PIXEL_IS_POINT: u16 = 2;

/// "user-defined" code in the GeoTIFF spec.
const USER_DEFINED: u16 = 32767;

/// One decoded GeoKey entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GeoKeyEntry {
    key: u16,
    location: u16,
    count: u16,
    value: u16,
}

/// Parsed GeoKey directory plus the ASCII parameter block it references.
#[derive(Debug, Clone, Default)]
pub struct GeoKeyDirectory {
    entries: Vec<GeoKeyEntry>,
    ascii: String,
}

impl GeoKeyDirectory {
    /// Decode the directory. Truncated directories keep whatever complete
    /// entries are present.
    pub fn parse(raw: &[u16], ascii: Option<String>) -> Self {
        let declared = raw.get(3).copied().unwrap_or(0) as usize;
        let entries = raw
            .get(4..)
            .unwrap_or(&[])
            .chunks_exact(4)
            .take(declared)
            .map(|c| GeoKeyEntry {
                key: c[0],
                location: c[1],
                count: c[2],
                value: c[3],
            })
            .collect();

        Self {
            entries,
            ascii: ascii.unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, key: u16) -> Option<&GeoKeyEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Inline `SHORT` value of a key.
    pub fn short(&self, key: u16) -> Option<u16> {
        self.entry(key)
            .filter(|e| e.location == 0)
            .map(|e| e.value)
    }

    /// ASCII value of a key, with the GeoTIFF `|` terminator removed.
    pub fn ascii(&self, key: u16) -> Option<String> {
        let entry = self.entry(key)?;
        if entry.location != GEO_ASCII_PARAMS {
            return None;
        }
        let start = entry.value as usize;
        let end = start + entry.count as usize;
        let text = self.ascii.get(start..end.min(self.ascii.len()))?;
        let text = text.trim_end_matches(['|', '\0']).trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Resolve the declared CRS.
    ///
    /// A projected EPSG code wins over a geographic one. Directories that
    /// only describe a user-defined system fall back to their citation text.
    pub fn crs(&self) -> Option<Crs> {
        if self.is_empty() {
            return None;
        }

        for key in [PROJECTED_CS_TYPE, GEOGRAPHIC_TYPE] {
            if let Some(code) = self.short(key) {
                if code != 0 && code != USER_DEFINED {
                    return Some(Crs::Epsg(code as u32));
                }
            }
        }

        let citation = [PCS_CITATION, GT_CITATION, GEOG_CITATION]
            .into_iter()
            .find_map(|key| self.ascii(key));

        match citation {
            Some(text) => Some(Crs::UserDefined(text)),
            None if self.entry(PROJECTED_CS_TYPE).is_some()
                || self.entry(GEOGRAPHIC_TYPE).is_some() =>
            {
                Some(Crs::UserDefined("user-defined".to_string()))
            }
            None => None,
        }
    }

    /// Whether pixel values refer to the pixel corner point rather than area.
    pub fn pixel_is_point(&self) -> bool {
        self.short(GT_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(keys: &[[u16; 4]]) -> Vec<u16> {
        let mut raw = vec![1, 1, 0, keys.len() as u16];
        for k in keys {
            raw.extend_from_slice(k);
        }
        raw
    }

    #[test]
    fn test_projected_code() {
        let raw = directory(&[
            [GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED],
            [PROJECTED_CS_TYPE, 0, 1, 32633],
        ]);
        let dir = GeoKeyDirectory::parse(&raw, None);
        assert_eq!(dir.crs(), Some(Crs::Epsg(32633)));
    }

    #[test]
    fn test_geographic_code() {
        let raw = directory(&[
            [GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC],
            [GEOGRAPHIC_TYPE, 0, 1, 4326],
        ]);
        let dir = GeoKeyDirectory::parse(&raw, None);
        assert_eq!(dir.crs(), Some(Crs::Epsg(4326)));
    }

    #[test]
    fn test_user_defined_with_citation() {
        let raw = directory(&[
            [PROJECTED_CS_TYPE, 0, 1, 32767],
            [PCS_CITATION, GEO_ASCII_PARAMS, 11, 0],
        ]);
        let dir = GeoKeyDirectory::parse(&raw, Some("Custom LCC||".to_string()));
        assert_eq!(dir.crs(), Some(Crs::UserDefined("Custom LCC".to_string())));
    }

    #[test]
    fn test_raster_type_only_means_no_crs() {
        let raw = directory(&[[GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]]);
        let dir = GeoKeyDirectory::parse(&raw, None);
        assert_eq!(dir.crs(), None);
        assert!(!dir.pixel_is_point());
    }

    #[test]
    fn test_truncated_directory() {
        let mut raw = directory(&[[GEOGRAPHIC_TYPE, 0, 1, 4269]]);
        raw[3] = 5;
        raw.push(GT_RASTER_TYPE);
        let dir = GeoKeyDirectory::parse(&raw, None);
        assert_eq!(dir.crs(), Some(Crs::Epsg(4269)));
    }
}
