//! Batch processing of a monthly raster series against one watershed.
//!
//! Every input raster yields exactly one outcome: a [`ZonalResult`] or a
//! [`SkipRecord`]. A failure on one raster never stops the batch, and
//! outcomes are reported in input order whether or not the run is parallel.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use geotiff_reader::DEFAULT_MAX_DECODE_BYTES;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::aggregate_grid;
use crate::config::ZonalConfig;
use crate::dem::summarize_dem_with_limit;
use crate::reproject::reproject_if_needed;
use crate::types::{
    AnalysisReport, BatchReport, BatchStatus, RasterInput, RasterOutcome, SkipRecord,
    ValidationVerdict, WarningRecord, ZonalResult, ZonalStats,
};
use crate::validator::inspect_with_limit;
use crate::watershed::Watershed;

/// Progress callback: `(completed, total, label)`, `completed` counting from 1.
pub type ProgressFn<'a> = dyn Fn(usize, usize, &str) + Sync + 'a;

const CANCELLED_REASON: &str = "cancelled before processing";

/// Runs the per-raster steps over a series.
pub struct BatchPipeline<'a> {
    config: ZonalConfig,
    progress: Option<&'a ProgressFn<'a>>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> BatchPipeline<'a> {
    pub fn new(config: ZonalConfig) -> Self {
        Self {
            config,
            progress: None,
            cancel: None,
        }
    }

    /// Report progress after each raster.
    pub fn with_progress(mut self, progress: &'a ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Stop starting new rasters once `flag` is set. Rasters already being
    /// processed finish; the rest are skipped as cancelled.
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &ZonalConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Process every raster and collect the outcomes.
    #[instrument(skip_all, fields(rasters = rasters.len(), parallel = self.config.parallel))]
    pub fn run(&self, watershed: &Watershed, rasters: &[RasterInput]) -> BatchReport {
        let total = rasters.len();
        let completed = AtomicUsize::new(0);

        let step = |input: &RasterInput| -> Option<RasterOutcome> {
            if self.is_cancelled() {
                return None;
            }
            let outcome = process_raster_with_limit(watershed, input, self.config.max_decode_bytes);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = self.progress {
                progress(done, total, &input.label);
            }
            Some(outcome)
        };

        let outcomes: Vec<Option<RasterOutcome>> = if self.config.parallel {
            self.run_parallel(rasters, &step)
        } else {
            rasters.iter().map(&step).collect()
        };

        let report = assemble(rasters, outcomes);
        info!(
            results = report.results.len(),
            skipped = report.skipped.len(),
            status = %report.status,
            "Batch finished"
        );
        report
    }

    fn run_parallel<F>(&self, rasters: &[RasterInput], step: &F) -> Vec<Option<RasterOutcome>>
    where
        F: Fn(&RasterInput) -> Option<RasterOutcome> + Sync,
    {
        let run = || -> Vec<Option<RasterOutcome>> { rasters.par_iter().map(step).collect() };

        match self.config.worker_threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    warn!(error = %e, "Failed to build worker pool, using the global pool");
                    run()
                }
            },
            None => run(),
        }
    }

    /// Batch results plus an optional DEM summary computed concurrently.
    ///
    /// A DEM failure is reported in the result and does not affect the batch.
    pub fn run_analysis(
        &self,
        watershed: &Watershed,
        rasters: &[RasterInput],
        dem: Option<&Path>,
    ) -> AnalysisReport {
        let (batch, elevation) = rayon::join(
            || self.run(watershed, rasters),
            || dem.map(|path| summarize_dem_with_limit(path, self.config.max_decode_bytes)),
        );

        let (elevation, elevation_error) = match elevation {
            Some(Ok(summary)) => (Some(summary), None),
            Some(Err(e)) => {
                warn!(error = %e, "DEM summary failed");
                (None, Some(e.to_string()))
            }
            None => (None, None),
        };

        AnalysisReport {
            batch,
            elevation,
            elevation_error,
        }
    }
}

/// Sequential batch with default settings.
pub fn run_batch(
    watershed: &Watershed,
    rasters: &[RasterInput],
    progress: Option<&ProgressFn<'_>>,
) -> BatchReport {
    let pipeline = BatchPipeline::new(ZonalConfig::default());
    match progress {
        Some(progress) => pipeline.with_progress(progress).run(watershed, rasters),
        None => pipeline.run(watershed, rasters),
    }
}

/// Validate, reproject and aggregate one raster.
///
/// The file is decoded once; the grid read during validation is reused for
/// aggregation.
pub fn process_raster(watershed: &Watershed, input: &RasterInput) -> RasterOutcome {
    process_raster_with_limit(watershed, input, DEFAULT_MAX_DECODE_BYTES)
}

/// [`process_raster`] with an explicit decode ceiling in bytes.
pub fn process_raster_with_limit(
    watershed: &Watershed,
    input: &RasterInput,
    max_decode_bytes: usize,
) -> RasterOutcome {
    let skip = |reason: String| {
        warn!(file = %input.label, reason = %reason, "Skipping raster");
        RasterOutcome::Skipped(SkipRecord::new(&input.label, reason))
    };

    let inspection = inspect_with_limit(&input.path, max_decode_bytes);
    let warnings: Vec<String> = match &inspection.report.verdict {
        ValidationVerdict::Invalid(fault) => return skip(fault.to_string()),
        verdict => verdict.warnings().iter().map(|w| w.to_string()).collect(),
    };

    let (Some(metadata), Some(grid)) = (inspection.report.metadata, inspection.grid) else {
        return skip("unreadable: raster was not decoded".to_string());
    };

    for warning in &warnings {
        warn!(file = %input.label, warning = %warning, "Raster warning");
    }

    let zone = match reproject_if_needed(watershed, metadata.crs.as_ref()) {
        Ok(zone) => zone,
        Err(e) => return skip(e.to_string()),
    };

    let overlaps = zone
        .bounding_box()
        .is_some_and(|bbox| metadata.extent().intersects(&bbox));
    let stats = if overlaps {
        match aggregate_grid(&zone.geometry, &grid, metadata.nodata) {
            Ok(stats) => stats,
            Err(e) => return skip(e.to_string()),
        }
    } else {
        debug!(file = %input.label, extent = ?metadata.extent(), "Watershed outside raster extent");
        ZonalStats::default()
    };

    if stats.is_empty() {
        debug!(file = %input.label, "Watershed covers no valid cell centers");
    }

    RasterOutcome::Completed {
        result: ZonalResult::new(input.month_label(), stats),
        warnings,
    }
}

fn assemble(rasters: &[RasterInput], outcomes: Vec<Option<RasterOutcome>>) -> BatchReport {
    let mut results = Vec::new();
    let mut skipped = Vec::new();
    let mut warnings = Vec::new();
    let mut cancelled = false;

    for (input, outcome) in rasters.iter().zip(outcomes) {
        match outcome {
            Some(RasterOutcome::Completed {
                result,
                warnings: w,
            }) => {
                if !w.is_empty() {
                    warnings.push(WarningRecord {
                        file_label: input.label.clone(),
                        warnings: w,
                    });
                }
                results.push(result);
            }
            Some(RasterOutcome::Skipped(record)) => skipped.push(record),
            None => {
                cancelled = true;
                skipped.push(SkipRecord::new(&input.label, CANCELLED_REASON));
            }
        }
    }

    let status = if cancelled {
        BatchStatus::Cancelled
    } else if results.is_empty() {
        BatchStatus::AllSkipped
    } else {
        BatchStatus::Completed
    };

    BatchReport {
        results,
        skipped,
        warnings,
        status,
    }
}
