//! GeoTIFF file reader.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

use crate::error::{GeoTiffError, GeoTiffResult};
use crate::geokeys::{self, GeoKeyDirectory};
use crate::grid::RasterGrid;
use crate::metadata::{GeoTransform, PixelDtype, RasterMetadata};

/// An open GeoTIFF file.
///
/// Opening only parses the TIFF header and first image directory; metadata
/// and pixels are pulled on demand so callers can reject a file (e.g. on band
/// count) before paying for the rest.
pub struct GeoTiffReader {
    decoder: Decoder<BufReader<File>>,
    path: PathBuf,
    max_decode_bytes: usize,
}

/// Ceiling on decoded sample bytes used by [`GeoTiffReader::open`].
pub const DEFAULT_MAX_DECODE_BYTES: usize = 1 << 30;

impl std::fmt::Debug for GeoTiffReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoTiffReader")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl GeoTiffReader {
    /// Open a GeoTIFF file with the default decode ceiling.
    pub fn open(path: impl AsRef<Path>) -> GeoTiffResult<Self> {
        Self::open_with_limit(path, DEFAULT_MAX_DECODE_BYTES)
    }

    /// Open a GeoTIFF file that refuses to decode more than
    /// `max_decode_bytes` of samples.
    pub fn open_with_limit(path: impl AsRef<Path>, max_decode_bytes: usize) -> GeoTiffResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        let mut limits = Limits::default();
        limits.decoding_buffer_size = max_decode_bytes;
        limits.intermediate_buffer_size = max_decode_bytes;
        let decoder = Decoder::new(BufReader::new(file))?.with_limits(limits);

        debug!(path = %path.display(), max_decode_bytes, "Opened GeoTIFF");
        Ok(Self {
            decoder,
            path,
            max_decode_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of samples per pixel, i.e. bands.
    pub fn band_count(&mut self) -> GeoTiffResult<usize> {
        let samples = self
            .decoder
            .find_tag(Tag::SamplesPerPixel)?
            .map(Value::into_u32)
            .transpose()?
            .unwrap_or(1);
        Ok(samples as usize)
    }

    fn pixel_dtype(&mut self) -> GeoTiffResult<PixelDtype> {
        let bits = match self.decoder.colortype()? {
            ColorType::Gray(bits) | ColorType::Palette(bits) => bits as u16,
            other => {
                return Err(GeoTiffError::UnsupportedLayout(format!(
                    "color type {:?}",
                    other
                )))
            }
        };
        let sample_format = self
            .find_u16_vec(Tag::SampleFormat)?
            .and_then(|v| v.first().copied())
            .unwrap_or(1);

        PixelDtype::from_tiff(sample_format, bits).ok_or_else(|| {
            GeoTiffError::UnsupportedLayout(format!(
                "sample format {} with {} bits",
                sample_format, bits
            ))
        })
    }

    /// Extract the full raster metadata. Requires a single-band file.
    pub fn metadata(&mut self) -> GeoTiffResult<RasterMetadata> {
        let band_count = self.band_count()?;
        if band_count != 1 {
            return Err(GeoTiffError::MultiBand(band_count));
        }

        let (width, height) = self.decoder.dimensions()?;
        if width == 0 || height == 0 {
            return Err(GeoTiffError::InvalidDimensions(width, height));
        }

        let pixel_dtype = self.pixel_dtype()?;
        let keys = self.geokeys()?;
        let geotransform = self.geotransform(&keys)?;
        let crs = keys.crs();
        let nodata = self.nodata(pixel_dtype)?;

        debug!(
            path = %self.path.display(),
            width,
            height,
            dtype = %pixel_dtype,
            crs = ?crs,
            nodata = ?nodata,
            "Extracted raster metadata"
        );

        Ok(RasterMetadata {
            band_count,
            width: width as usize,
            height: height as usize,
            crs,
            nodata,
            pixel_dtype,
            resolution: geotransform.resolution(),
            geotransform,
        })
    }

    /// Decode the full pixel grid of a single-band file.
    ///
    /// The declared size is checked against the decode ceiling before any
    /// sample buffer is allocated.
    pub fn read_grid(&mut self, metadata: &RasterMetadata) -> GeoTiffResult<RasterGrid> {
        let bytes = metadata
            .width
            .checked_mul(metadata.height)
            .and_then(|cells| cells.checked_mul(metadata.pixel_dtype.bytes_per_sample()))
            .unwrap_or(usize::MAX);
        if bytes > self.max_decode_bytes {
            return Err(GeoTiffError::TooLarge {
                bytes,
                limit: self.max_decode_bytes,
            });
        }

        let data = match self.decoder.read_image()? {
            DecodingResult::U8(v) => widen(v),
            DecodingResult::U16(v) => widen(v),
            DecodingResult::U32(v) => widen(v),
            DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
            DecodingResult::I8(v) => widen(v),
            DecodingResult::I16(v) => widen(v),
            DecodingResult::I32(v) => widen(v),
            DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
            DecodingResult::F32(v) => widen(v),
            DecodingResult::F64(v) => v,
            #[allow(unreachable_patterns)]
            _ => {
                return Err(GeoTiffError::UnsupportedLayout(
                    "unsupported sample type".to_string(),
                ))
            }
        };

        let expected = metadata.width * metadata.height;
        if data.len() != expected {
            return Err(GeoTiffError::UnsupportedLayout(format!(
                "decoded {} samples, expected {}",
                data.len(),
                expected
            )));
        }

        Ok(RasterGrid::new(
            data,
            metadata.width,
            metadata.height,
            metadata.geotransform,
            metadata.nodata,
        ))
    }

    /// Single-valued and list-valued SHORT tags both come back as a vec.
    fn find_u16_vec(&mut self, tag: Tag) -> GeoTiffResult<Option<Vec<u16>>> {
        Ok(self.decoder.find_tag_unsigned_vec::<u16>(tag)?)
    }

    fn find_f64_vec(&mut self, code: u16) -> GeoTiffResult<Option<Vec<f64>>> {
        Ok(self
            .decoder
            .find_tag(Tag::from_u16_exhaustive(code))?
            .map(Value::into_f64_vec)
            .transpose()?)
    }

    fn find_ascii(&mut self, code: u16) -> GeoTiffResult<Option<String>> {
        Ok(self
            .decoder
            .find_tag(Tag::from_u16_exhaustive(code))?
            .map(Value::into_string)
            .transpose()?
            .map(|s| s.trim_end_matches('\0').to_string()))
    }

    fn geokeys(&mut self) -> GeoTiffResult<GeoKeyDirectory> {
        let raw = self.find_u16_vec(Tag::from_u16_exhaustive(geokeys::GEO_KEY_DIRECTORY))?;
        let Some(raw) = raw else {
            return Ok(GeoKeyDirectory::default());
        };
        let ascii = self.find_ascii(geokeys::GEO_ASCII_PARAMS)?;
        Ok(GeoKeyDirectory::parse(&raw, ascii))
    }

    fn geotransform(&mut self, keys: &GeoKeyDirectory) -> GeoTiffResult<GeoTransform> {
        let transform = if let Some(m) = self.find_f64_vec(geokeys::MODEL_TRANSFORMATION)? {
            if m.len() < 8 {
                return Err(GeoTiffError::InvalidGeoreference(format!(
                    "ModelTransformation has {} values",
                    m.len()
                )));
            }
            GeoTransform([m[3], m[0], m[1], m[7], m[4], m[5]])
        } else {
            let scale = self.find_f64_vec(geokeys::MODEL_PIXEL_SCALE)?;
            let tiepoint = self.find_f64_vec(geokeys::MODEL_TIEPOINT)?;
            match (scale, tiepoint) {
                (Some(scale), Some(tie)) => {
                    if scale.len() < 2 || tie.len() < 6 {
                        return Err(GeoTiffError::InvalidGeoreference(
                            "short ModelPixelScale or ModelTiepoint".to_string(),
                        ));
                    }
                    let (sx, sy) = (scale[0], scale[1]);
                    GeoTransform::north_up(tie[3] - tie[0] * sx, tie[4] + tie[1] * sy, sx, sy)
                }
                _ => return Ok(GeoTransform::IDENTITY),
            }
        };

        let (res_x, res_y) = transform.resolution();
        if !(res_x > 0.0 && res_y > 0.0 && res_x.is_finite() && res_y.is_finite()) {
            return Err(GeoTiffError::InvalidGeoreference(format!(
                "non-positive pixel size ({}, {})",
                res_x, res_y
            )));
        }

        if keys.pixel_is_point() {
            // Tiepoint refers to the pixel center; shift to the corner.
            let mut gt = transform.0;
            gt[0] -= 0.5 * (gt[1] + gt[2]);
            gt[3] -= 0.5 * (gt[4] + gt[5]);
            return Ok(GeoTransform(gt));
        }

        Ok(transform)
    }

    fn nodata(&mut self, dtype: PixelDtype) -> GeoTiffResult<Option<f64>> {
        let Some(text) = self.find_ascii(geokeys::GDAL_NODATA)? else {
            return Ok(None);
        };
        Ok(parse_nodata(&text, dtype))
    }
}

fn widen<T: Into<f64>>(values: Vec<T>) -> Vec<f64> {
    values.into_iter().map(Into::into).collect()
}

/// Parse a GDAL nodata string, rounding to the precision of the sample type.
fn parse_nodata(text: &str, dtype: PixelDtype) -> Option<f64> {
    let text = text.trim();
    let value = if text.eq_ignore_ascii_case("nan") {
        f64::NAN
    } else {
        text.parse::<f64>().ok()?
    };
    Some(match dtype {
        PixelDtype::F32 => value as f32 as f64,
        _ => value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nodata() {
        assert_eq!(parse_nodata("-9999", PixelDtype::F64), Some(-9999.0));
        assert_eq!(parse_nodata(" 0 ", PixelDtype::U16), Some(0.0));
        assert!(parse_nodata("nan", PixelDtype::F32).unwrap().is_nan());
        assert_eq!(parse_nodata("garbage", PixelDtype::F32), None);
    }

    #[test]
    fn test_nodata_rounded_to_f32() {
        let nd = parse_nodata("-3.4028234663852886e+38", PixelDtype::F32).unwrap();
        assert_eq!(nd, f32::MIN as f64);
        let nd = parse_nodata("0.1", PixelDtype::F32).unwrap();
        assert_eq!(nd, 0.1f32 as f64);
    }
}
