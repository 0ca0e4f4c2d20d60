//! Resolution and CRS agreement across a raster series.

use std::fmt;

use geotiff_reader::RasterMetadata;
use raster_common::Crs;
use serde::Serialize;

/// How one raster differs from the first raster of the series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    /// Position in the input slice.
    pub index: usize,
    pub resolution: Option<((f64, f64), (f64, f64))>,
    pub crs: Option<(Option<Crs>, Option<Crs>)>,
}

impl Discrepancy {
    /// What differs, without the raster index.
    pub fn details(&self) -> String {
        let mut parts = Vec::new();
        if let Some((expected, found)) = self.resolution {
            parts.push(format!(
                "resolution ({}, {}) differs from ({}, {})",
                found.0, found.1, expected.0, expected.1
            ));
        }
        if let Some((expected, found)) = &self.crs {
            parts.push(format!(
                "CRS {} differs from {}",
                crs_label(found.as_ref()),
                crs_label(expected.as_ref())
            ));
        }
        parts.join(", ")
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "raster {}: {}", self.index, self.details())
    }
}

/// Outcome of comparing a raster series against its first member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub passed: bool,
    /// Number of rasters compared.
    pub compared: usize,
    pub reference_resolution: Option<(f64, f64)>,
    pub reference_crs: Option<Crs>,
    pub discrepancies: Vec<Discrepancy>,
}

impl ConsistencyReport {
    /// Human-readable summary. An empty series yields "nothing to compare".
    pub fn message(&self) -> String {
        if self.compared == 0 {
            return "nothing to compare".to_string();
        }
        if self.passed {
            let (rx, ry) = self.reference_resolution.unwrap_or_default();
            return format!(
                "all {} rasters share resolution ({}, {}) and CRS {}",
                self.compared,
                rx,
                ry,
                crs_label(self.reference_crs.as_ref())
            );
        }
        self.discrepancies
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn crs_label(crs: Option<&Crs>) -> String {
    crs.map_or_else(|| "undefined".to_string(), |c| c.to_string())
}

fn resolution_matches(a: (f64, f64), b: (f64, f64), tolerance: f64) -> bool {
    if tolerance == 0.0 {
        a == b
    } else {
        (a.0 - b.0).abs() <= tolerance && (a.1 - b.1).abs() <= tolerance
    }
}

/// Compare every raster against the first one with exact resolution equality.
pub fn check_consistency(metadata: &[RasterMetadata]) -> ConsistencyReport {
    check_consistency_with_tolerance(metadata, 0.0)
}

/// Compare every raster against the first one.
///
/// Two absent CRS are equal; an absent and a present CRS are not. An empty
/// series fails: there is no reference to hold the others to.
pub fn check_consistency_with_tolerance(
    metadata: &[RasterMetadata],
    tolerance: f64,
) -> ConsistencyReport {
    let Some(first) = metadata.first() else {
        return ConsistencyReport {
            passed: false,
            compared: 0,
            reference_resolution: None,
            reference_crs: None,
            discrepancies: Vec::new(),
        };
    };

    let discrepancies: Vec<Discrepancy> = metadata
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(index, m)| {
            let resolution = (!resolution_matches(first.resolution, m.resolution, tolerance))
                .then_some((first.resolution, m.resolution));
            let crs = (first.crs != m.crs).then(|| (first.crs.clone(), m.crs.clone()));
            (resolution.is_some() || crs.is_some()).then_some(Discrepancy {
                index,
                resolution,
                crs,
            })
        })
        .collect();

    ConsistencyReport {
        passed: discrepancies.is_empty(),
        compared: metadata.len(),
        reference_resolution: Some(first.resolution),
        reference_crs: first.crs.clone(),
        discrepancies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotiff_reader::{GeoTransform, PixelDtype};

    fn meta(res: f64, crs: Option<Crs>) -> RasterMetadata {
        RasterMetadata {
            band_count: 1,
            width: 10,
            height: 10,
            crs,
            nodata: None,
            pixel_dtype: PixelDtype::F32,
            resolution: (res, res),
            geotransform: GeoTransform::north_up(0.0, 10.0, res, res),
        }
    }

    #[test]
    fn test_empty_series_fails() {
        let report = check_consistency(&[]);
        assert!(!report.passed);
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.message(), "nothing to compare");
    }

    #[test]
    fn test_single_raster_passes() {
        let report = check_consistency(&[meta(0.1, Some(Crs::WGS84))]);
        assert!(report.passed);
        assert!(report.discrepancies.is_empty());
    }

    #[test]
    fn test_matching_series_passes() {
        let series = vec![meta(0.1, Some(Crs::WGS84)); 3];
        let report = check_consistency(&series);
        assert!(report.passed);
        assert!(report.message().starts_with("all 3 rasters"));
    }

    #[test]
    fn test_resolution_mismatch_names_index() {
        let series = vec![
            meta(0.1, Some(Crs::WGS84)),
            meta(0.1, Some(Crs::WGS84)),
            meta(0.25, Some(Crs::WGS84)),
        ];
        let report = check_consistency(&series);
        assert!(!report.passed);
        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.discrepancies[0].index, 2);
        assert!(report.discrepancies[0].crs.is_none());
        assert!(report.message().contains("raster 2"));
    }

    #[test]
    fn test_crs_mismatch_and_missing_crs() {
        let series = vec![
            meta(0.1, Some(Crs::WGS84)),
            meta(0.1, Some(Crs::Epsg(32633))),
            meta(0.1, None),
        ];
        let report = check_consistency(&series);
        let indexes: Vec<usize> = report.discrepancies.iter().map(|d| d.index).collect();
        assert_eq!(indexes, vec![1, 2]);
        assert!(report.message().contains("undefined"));
        assert_eq!(
            report.discrepancies[0].details(),
            "CRS EPSG:32633 differs from EPSG:4326"
        );

        let both_missing = vec![meta(0.1, None), meta(0.1, None)];
        assert!(check_consistency(&both_missing).passed);
    }

    #[test]
    fn test_tolerance() {
        let series = vec![meta(0.1, None), meta(0.1 + 1e-12, None)];
        assert!(!check_consistency(&series).passed);
        assert!(check_consistency_with_tolerance(&series, 1e-9).passed);
    }
}
