//! Watershed rainfall zonal statistics.
//!
//! Given a watershed polygon and a series of monthly rainfall GeoTIFFs, this
//! crate validates each raster, checks the series for a shared resolution
//! and CRS, reprojects the watershed into each raster's CRS and aggregates
//! the valid cells whose centers fall inside it.
//!
//! # Architecture
//!
//! ```text
//! GeoJSON ──► WatershedLayer ──select──► Watershed
//!                                            │
//! GeoTIFF ──► validator::inspect ──► reproject_if_needed ──► aggregate_grid
//!                 │                                               │
//!                 └──────── SkipRecord ◄── any failure            ▼
//!                                                            ZonalResult
//! ```
//!
//! [`BatchPipeline`] runs these steps over a series, sequentially or on a
//! rayon pool, and always returns one outcome per input raster.
//!
//! # Example
//!
//! ```ignore
//! use zonal_stats::{run_batch, RasterInput, WatershedLayer};
//!
//! let layer = WatershedLayer::from_path("basins.geojson")?;
//! let basin = layer.select("NAME", "Upper Tana")?;
//! let inputs = vec![RasterInput::from_path("rain/01-2020.tif")];
//! let report = run_batch(&basin, &inputs, None);
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod consistency;
pub mod dem;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod reproject;
pub mod types;
pub mod validator;
pub mod watershed;

pub use aggregate::{aggregate, aggregate_grid};
pub use cache::{content_key, WatershedCache};
pub use config::ZonalConfig;
pub use consistency::{
    check_consistency, check_consistency_with_tolerance, ConsistencyReport, Discrepancy,
};
pub use dem::{summarize_dem, summarize_dem_with_limit, summarize_grid};
pub use error::{Result, ZonalError};
pub use export::{
    parse_month_label, seasonal_summaries, sort_chronologically, to_csv_string, write_csv,
    CSV_HEADER,
};
pub use pipeline::{process_raster, process_raster_with_limit, run_batch, BatchPipeline, ProgressFn};
pub use reproject::reproject_if_needed;
pub use types::{
    AnalysisReport, BatchReport, BatchStatus, CacheStats, ElevationSummary, RasterFault,
    RasterInput, RasterOutcome, RasterWarning, Season, SeasonalSummary, SkipRecord,
    ValidationVerdict, WarningRecord, ZonalResult, ZonalStats,
};
pub use validator::{inspect, inspect_with_limit, validate, Inspection, ValidationReport};
pub use watershed::{Watershed, WatershedLayer};
