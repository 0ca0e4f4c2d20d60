//! Core types for zonal rainfall statistics.

use std::fmt;
use std::path::{Path, PathBuf};

use geotiff_reader::PixelDtype;
use raster_common::Crs;
use serde::{Deserialize, Serialize};

/// Non-fatal condition found while validating a raster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterWarning {
    /// No coordinate reference system is declared.
    NoCrs,
    /// Sample type outside float32/float64/int16/int32/uint16/uint32.
    UnusualDtype(PixelDtype),
    /// At least one valid cell is below zero.
    NegativeValues,
}

impl fmt::Display for RasterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCrs => write!(f, "no CRS defined"),
            Self::UnusualDtype(dtype) => write!(f, "unusual dtype: {}", dtype),
            Self::NegativeValues => write!(f, "negative values present"),
        }
    }
}

/// Reason a raster cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterFault {
    /// Open or decode failed.
    Unreadable(String),
    /// More than one band.
    MultiBand(usize),
    /// Every cell is NoData or NaN.
    NoValidData,
}

impl fmt::Display for RasterFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(cause) => write!(f, "unreadable: {}", cause),
            Self::MultiBand(n) => write!(f, "multi-band ({} bands)", n),
            Self::NoValidData => write!(f, "no valid data"),
        }
    }
}

/// Outcome of validating one raster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reasons", rename_all = "snake_case")]
pub enum ValidationVerdict {
    Valid,
    /// Usable, with every non-fatal condition that was found.
    Warning(Vec<RasterWarning>),
    Invalid(RasterFault),
}

impl ValidationVerdict {
    /// Whether the raster may be aggregated (Valid or Warning).
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }

    /// Warnings carried by the verdict, if any.
    pub fn warnings(&self) -> &[RasterWarning] {
        match self {
            Self::Warning(w) => w,
            _ => &[],
        }
    }
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Warning(warnings) => {
                let reasons: Vec<String> = warnings.iter().map(|w| w.to_string()).collect();
                write!(f, "warning: {}", reasons.join("; "))
            }
            Self::Invalid(fault) => write!(f, "invalid: {}", fault),
        }
    }
}

/// Summary statistics over the valid cells of a zone.
///
/// All fields are zero when no cell center fell inside the zone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZonalStats {
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl ZonalStats {
    /// Accumulate statistics from an iterator of valid values.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            sum,
            mean: sum / count as f64,
            min,
            max,
            count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Per-month statistics for one successfully processed raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalResult {
    /// Raster file name without extension, e.g. `"01-2020"`.
    pub month_label: String,
    /// Sum of valid cells whose center lies inside the watershed.
    pub total_rainfall: f64,
    /// Mean of those cells.
    pub mean_rainfall: f64,
    pub min_rainfall: f64,
    pub max_rainfall: f64,
    pub pixel_count: usize,
}

impl ZonalResult {
    pub fn new(month_label: impl Into<String>, stats: ZonalStats) -> Self {
        Self {
            month_label: month_label.into(),
            total_rainfall: stats.sum,
            mean_rainfall: stats.mean,
            min_rainfall: stats.min,
            max_rainfall: stats.max,
            pixel_count: stats.count,
        }
    }
}

/// A raster the batch could not use, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub file_label: String,
    pub reason: String,
}

impl SkipRecord {
    pub fn new(file_label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file_label: file_label.into(),
            reason: reason.into(),
        }
    }
}

/// Warnings reported for a raster that was still processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub file_label: String,
    pub warnings: Vec<String>,
}

/// Descriptive statistics of a DEM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// `max - min`.
    pub relief: f64,
    pub crs: Option<Crs>,
    pub resolution: (f64, f64),
    pub valid_pixel_count: usize,
}

/// One raster handed to the batch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterInput {
    /// Original file name, e.g. `"01-2020.tif"`.
    pub label: String,
    pub path: PathBuf,
}

impl RasterInput {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Use the file name of `path` as the label.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { label, path }
    }

    /// Label with its extension removed: `"01-2020.tif"` becomes `"01-2020"`.
    pub fn month_label(&self) -> String {
        Path::new(&self.label)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.label.clone())
    }
}

/// Result of processing one raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RasterOutcome {
    Completed {
        result: ZonalResult,
        warnings: Vec<String>,
    },
    Skipped(SkipRecord),
}

/// Overall status of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// At least one raster produced a result.
    Completed,
    /// Every raster was skipped.
    AllSkipped,
    /// The run was stopped before every raster was attempted.
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::AllSkipped => "all_skipped",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Everything a batch run produced, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<ZonalResult>,
    pub skipped: Vec<SkipRecord>,
    pub warnings: Vec<WarningRecord>,
    pub status: BatchStatus,
}

impl BatchReport {
    /// Number of rasters the report accounts for.
    pub fn total(&self) -> usize {
        self.results.len() + self.skipped.len()
    }
}

/// Batch results together with the optional DEM summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub batch: BatchReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<ElevationSummary>,
    /// Why the DEM could not be summarized, if it was supplied and failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_error: Option<String>,
}

/// Rainfall aggregated over the months of a meteorological season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalSummary {
    pub season: Season,
    pub year: i32,
    pub months: usize,
    pub total_rainfall: f64,
    pub mean_monthly_rainfall: f64,
}

impl SeasonalSummary {
    /// Group monthly results by season. See [`crate::export::seasonal_summaries`].
    pub fn from_results(results: &[ZonalResult]) -> Vec<Self> {
        crate::export::seasonal_summaries(results)
    }
}

/// Meteorological season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    /// December, January, February.
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Season for a month number (1-12).
    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Self::Winter),
            3..=5 => Some(Self::Spring),
            6..=8 => Some(Self::Summer),
            9..=11 => Some(Self::Autumn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Hit/miss counters for the watershed layer cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_values() {
        let stats = ZonalStats::from_values([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(stats.sum, 45.0);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.count, 9);
    }

    #[test]
    fn test_stats_empty_is_zero() {
        let stats = ZonalStats::from_values(std::iter::empty());
        assert_eq!(stats, ZonalStats::default());
        assert!(stats.is_empty());
    }

    #[test]
    fn test_month_label_strips_extension() {
        assert_eq!(RasterInput::new("01-2020.tif", "/x").month_label(), "01-2020");
        assert_eq!(RasterInput::new("rain.01-2020.tiff", "/x").month_label(), "rain.01-2020");
        assert_eq!(RasterInput::new("03-2021", "/x").month_label(), "03-2021");
        assert_eq!(RasterInput::from_path("/data/rain/07-2019.tif").label, "07-2019.tif");
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(ValidationVerdict::Valid.to_string(), "valid");
        let v = ValidationVerdict::Warning(vec![RasterWarning::NoCrs, RasterWarning::NegativeValues]);
        assert_eq!(v.to_string(), "warning: no CRS defined; negative values present");
        assert!(v.is_usable());
        assert_eq!(v.warnings().len(), 2);

        let v = ValidationVerdict::Invalid(RasterFault::MultiBand(3));
        assert_eq!(v.to_string(), "invalid: multi-band (3 bands)");
        assert!(!v.is_usable());
    }

    #[test]
    fn test_season_from_month() {
        assert_eq!(Season::from_month(12), Some(Season::Winter));
        assert_eq!(Season::from_month(1), Some(Season::Winter));
        assert_eq!(Season::from_month(4), Some(Season::Spring));
        assert_eq!(Season::from_month(8), Some(Season::Summer));
        assert_eq!(Season::from_month(10), Some(Season::Autumn));
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn test_cache_hit_rate() {
        let mut stats = CacheStats::default();
        assert!((stats.hit_rate() - 0.0).abs() < f64::EPSILON);

        stats.hits = 3;
        stats.misses = 1;
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
