//! On-disk fixtures: synthetic GeoTIFF rasters and GeoJSON watershed layers.
//!
//! Rasters are written with the `tiff` encoder plus the GeoTIFF tags the
//! reader understands, so tests exercise the same decode path as real
//! monthly rainfall files.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tiff::encoder::{colortype, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tiff::TiffResult;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

#[derive(Debug, Clone)]
enum FixtureData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    U8(Vec<u8>),
    Rgb8(Vec<u8>),
}

/// Builder for a small georeferenced GeoTIFF.
///
/// Defaults: north-up, 1x1 pixels, upper-left corner at `(0, height)` so the
/// raster covers `[0, width] x [0, height]`, CRS EPSG:4326, no nodata.
///
/// # Example
///
/// ```ignore
/// let path = GeoTiffFixture::float32(3, 3, create_sequence_grid(3, 3))
///     .nodata(-9999.0)
///     .write(dir.path().join("01-2020.tif"))?;
/// ```
#[derive(Debug, Clone)]
pub struct GeoTiffFixture {
    width: u32,
    height: u32,
    data: FixtureData,
    origin: (f64, f64),
    resolution: (f64, f64),
    epsg: Option<u16>,
    nodata: Option<String>,
}

impl GeoTiffFixture {
    fn new(width: u32, height: u32, data: FixtureData) -> Self {
        Self {
            width,
            height,
            data,
            origin: (0.0, height as f64),
            resolution: (1.0, 1.0),
            epsg: Some(4326),
            nodata: None,
        }
    }

    /// Single-band float32 raster.
    pub fn float32(width: u32, height: u32, data: Vec<f32>) -> Self {
        Self::new(width, height, FixtureData::F32(data))
    }

    /// Single-band float64 raster.
    pub fn float64(width: u32, height: u32, data: Vec<f64>) -> Self {
        Self::new(width, height, FixtureData::F64(data))
    }

    /// Single-band uint8 raster (an unusual dtype for rainfall).
    pub fn uint8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, FixtureData::U8(data))
    }

    /// Three-band RGB raster filled with a constant gray.
    pub fn rgb8(width: u32, height: u32) -> Self {
        let samples = vec![128u8; (width * height * 3) as usize];
        Self::new(width, height, FixtureData::Rgb8(samples))
    }

    /// Upper-left corner in world coordinates.
    pub fn origin(mut self, x: f64, y: f64) -> Self {
        self.origin = (x, y);
        self
    }

    /// Pixel size. The origin is kept as-is.
    pub fn resolution(mut self, x: f64, y: f64) -> Self {
        self.resolution = (x, y);
        self
    }

    pub fn epsg(mut self, code: u16) -> Self {
        self.epsg = Some(code);
        self
    }

    /// Omit the GeoKey directory entirely.
    pub fn without_crs(mut self) -> Self {
        self.epsg = None;
        self
    }

    pub fn nodata(mut self, value: f64) -> Self {
        self.nodata = Some(value.to_string());
        self
    }

    /// Write the raster to `path`, returning the path for convenience.
    pub fn write(&self, path: impl AsRef<Path>) -> TiffResult<PathBuf> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
        let (w, h) = (self.width, self.height);

        match &self.data {
            FixtureData::F32(v) => {
                let mut image = encoder.new_image::<colortype::Gray32Float>(w, h)?;
                self.write_geo_tags(image.encoder())?;
                image.write_data(v)?;
            }
            FixtureData::F64(v) => {
                let mut image = encoder.new_image::<colortype::Gray64Float>(w, h)?;
                self.write_geo_tags(image.encoder())?;
                image.write_data(v)?;
            }
            FixtureData::U8(v) => {
                let mut image = encoder.new_image::<colortype::Gray8>(w, h)?;
                self.write_geo_tags(image.encoder())?;
                image.write_data(v)?;
            }
            FixtureData::Rgb8(v) => {
                let mut image = encoder.new_image::<colortype::RGB8>(w, h)?;
                self.write_geo_tags(image.encoder())?;
                image.write_data(v)?;
            }
        }

        Ok(path)
    }

    fn write_geo_tags<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<'_, W, K>,
    ) -> TiffResult<()> {
        let scale = [self.resolution.0, self.resolution.1, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, self.origin.0, self.origin.1, 0.0];
        dir.write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &scale[..])?;
        dir.write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &tiepoint[..])?;

        if let Some(code) = self.epsg {
            let geographic = (4000..5000).contains(&code);
            let (model_type, cs_key) = if geographic { (2, 2048) } else { (1, 3072) };
            let keys: [u16; 16] = [
                1, 1, 0, 3, //
                1024, 0, 1, model_type, //
                1025, 0, 1, 1, //
                cs_key, 0, 1, code,
            ];
            dir.write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), &keys[..])?;
        }

        if let Some(nodata) = &self.nodata {
            dir.write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), nodata.as_str())?;
        }

        Ok(())
    }
}

/// Write bytes that are not a TIFF at all.
pub fn write_corrupt_raster(path: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    let mut file = File::create(&path)?;
    file.write_all(b"this is not a GeoTIFF, just some bytes")?;
    Ok(path)
}

/// Copy the first `keep` bytes of `src` to `dst`, simulating an interrupted upload.
pub fn write_truncated_copy(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    keep: usize,
) -> std::io::Result<PathBuf> {
    let bytes = std::fs::read(src)?;
    let dst = dst.as_ref().to_path_buf();
    std::fs::write(&dst, &bytes[..keep.min(bytes.len())])?;
    Ok(dst)
}

/// Write a float32 TIFF whose directory declares `width` x `height` pixels
/// but whose single strip holds only a handful of bytes.
///
/// The header is hand-assembled so the declared size can be far larger than
/// anything the encoder would be asked to produce.
pub fn write_oversized_header(
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
) -> std::io::Result<PathBuf> {
    const SHORT: u16 = 3;
    const LONG: u16 = 4;
    const ENTRIES: u16 = 10;
    const IFD_OFFSET: u32 = 8;
    let data_offset = IFD_OFFSET + 2 + u32::from(ENTRIES) * 12 + 4;
    let strip_bytes = u64::from(width) * u64::from(height) * 4;
    let strip_bytes = u32::try_from(strip_bytes).unwrap_or(u32::MAX);

    // Entries must be sorted by tag.
    let entries: [(u16, u16, u32); ENTRIES as usize] = [
        (256, LONG, width),        // ImageWidth
        (257, LONG, height),       // ImageLength
        (258, SHORT, 32),          // BitsPerSample
        (259, SHORT, 1),           // Compression: none
        (262, SHORT, 1),           // PhotometricInterpretation: BlackIsZero
        (273, LONG, data_offset),  // StripOffsets
        (277, SHORT, 1),           // SamplesPerPixel
        (278, LONG, height),       // RowsPerStrip
        (279, LONG, strip_bytes),  // StripByteCounts
        (339, SHORT, 3),           // SampleFormat: IEEE float
    ];

    let mut bytes = Vec::with_capacity(data_offset as usize + 16);
    bytes.extend_from_slice(b"II");
    bytes.extend_from_slice(&42u16.to_le_bytes());
    bytes.extend_from_slice(&IFD_OFFSET.to_le_bytes());
    bytes.extend_from_slice(&ENTRIES.to_le_bytes());
    for (tag, kind, value) in entries {
        bytes.extend_from_slice(&tag.to_le_bytes());
        bytes.extend_from_slice(&kind.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        if kind == SHORT {
            bytes.extend_from_slice(&(value as u16).to_le_bytes());
            bytes.extend_from_slice(&[0, 0]);
        } else {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 16]);

    let path = path.as_ref().to_path_buf();
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// A closed, axis-aligned rectangular ring.
pub fn rectangle_ring(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<[f64; 2]> {
    vec![
        [min_x, min_y],
        [max_x, min_y],
        [max_x, max_y],
        [min_x, max_y],
        [min_x, min_y],
    ]
}

/// Build a GeoJSON FeatureCollection of polygon features.
///
/// Each feature is `(properties, outer_ring)`. `crs` adds the legacy named
/// CRS member (e.g. `"EPSG:32633"`).
pub fn watershed_geojson(features: &[(Value, Vec<[f64; 2]>)], crs: Option<&str>) -> String {
    let features: Vec<Value> = features
        .iter()
        .map(|(props, ring)| {
            json!({
                "type": "Feature",
                "properties": props,
                "geometry": { "type": "Polygon", "coordinates": [ring] }
            })
        })
        .collect();

    let mut collection = json!({ "type": "FeatureCollection", "features": features });
    if let Some(name) = crs {
        collection["crs"] = json!({ "type": "name", "properties": { "name": name } });
    }
    collection.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_ring_is_closed() {
        let ring = rectangle_ring(0.0, 0.0, 2.0, 1.0);
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_watershed_geojson_shape() {
        let text = watershed_geojson(
            &[(json!({"NAME": "Upper"}), rectangle_ring(0.0, 0.0, 1.0, 1.0))],
            Some("EPSG:4326"),
        );
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["features"][0]["properties"]["NAME"], "Upper");
        assert_eq!(value["crs"]["properties"]["name"], "EPSG:4326");
    }

    #[test]
    fn test_fixture_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = GeoTiffFixture::float32(2, 2, vec![1.0, 2.0, 3.0, 4.0])
            .nodata(-9999.0)
            .write(dir.path().join("a.tif"))
            .unwrap();
        let bytes = std::fs::read(path).unwrap();
        assert!(&bytes[..2] == b"II" || &bytes[..2] == b"MM");
    }

    #[test]
    fn test_oversized_header_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_oversized_header(dir.path().join("huge.tif"), 100_000, 100_000).unwrap();
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[..4], b"II*\0");
        assert_eq!(bytes.len(), 8 + 2 + 10 * 12 + 4 + 16);
        // ImageWidth entry value
        assert_eq!(&bytes[18..22], &100_000u32.to_le_bytes());
    }
}
