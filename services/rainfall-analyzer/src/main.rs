//! Watershed rainfall analyzer.
//!
//! Validates monthly rainfall GeoTIFFs, checks them for a shared resolution
//! and CRS, and computes zonal rainfall statistics over a watershed selected
//! from a GeoJSON layer.

mod inputs;
mod output;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use zonal_stats::{
    check_consistency_with_tolerance, inspect_with_limit, sort_chronologically,
    summarize_dem_with_limit, BatchPipeline, BatchStatus, ProgressFn, RasterInput,
    SeasonalSummary, WatershedLayer, ZonalConfig,
};

use inputs::collect_rasters;

#[derive(Parser, Debug)]
#[command(name = "rainfall-analyzer")]
#[command(about = "Zonal rainfall statistics for a watershed over monthly GeoTIFFs")]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// YAML configuration file (defaults come from the environment)
    #[arg(long, env = "ZONAL_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate each raster and print its verdict
    Validate {
        /// Raster files or directories
        #[arg(required = true)]
        rasters: Vec<PathBuf>,
    },

    /// Check that rasters share resolution and CRS
    Check {
        /// Raster files or directories
        #[arg(required = true)]
        rasters: Vec<PathBuf>,
    },

    /// Compute monthly zonal statistics for one watershed
    Run {
        /// GeoJSON watershed layer
        #[arg(short, long)]
        watershed: PathBuf,

        /// Attribute column used to pick the watershed
        #[arg(short, long)]
        attribute: String,

        /// Attribute value of the watershed
        #[arg(short, long)]
        value: String,

        /// Raster files or directories
        #[arg(required = true)]
        rasters: Vec<PathBuf>,

        /// Optional DEM to summarize alongside the batch
        #[arg(long)]
        dem: Option<PathBuf>,

        /// Write results as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the full report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Process rasters in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Summarize a DEM
    Dem {
        path: PathBuf,
    },

    /// List the values of an attribute column in a watershed layer
    Regions {
        /// GeoJSON watershed layer
        #[arg(short, long)]
        watershed: PathBuf,

        /// Attribute column; omit to list the columns
        #[arg(short, long)]
        attribute: Option<String>,
    },
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate { rasters } => cmd_validate(&rasters, &config),
        Commands::Check { rasters } => cmd_check(&rasters, &config),
        Commands::Run {
            watershed,
            attribute,
            value,
            rasters,
            dem,
            csv,
            json,
            parallel,
        } => {
            let mut config = config;
            config.parallel |= parallel;
            cmd_run(RunArgs {
                watershed,
                attribute,
                value,
                rasters,
                dem,
                csv,
                json,
                config,
            })
        }
        Commands::Dem { path } => cmd_dem(&path, &config),
        Commands::Regions {
            watershed,
            attribute,
        } => cmd_regions(&watershed, attribute.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ZonalConfig> {
    let config = match path {
        Some(path) => ZonalConfig::from_yaml(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ZonalConfig::from_env(),
    };
    if let Err(e) = config.validate() {
        bail!("Invalid configuration: {}", e);
    }
    Ok(config)
}

fn cmd_validate(paths: &[PathBuf], config: &ZonalConfig) -> Result<()> {
    let rasters = collect_rasters(paths)?;
    let reports: Vec<_> = rasters
        .iter()
        .map(|path| inspect_with_limit(path, config.max_decode_bytes).report)
        .collect();
    print!("{}", output::format_validation(&reports));
    Ok(())
}

fn cmd_check(paths: &[PathBuf], config: &ZonalConfig) -> Result<()> {
    let rasters = collect_rasters(paths)?;

    let mut metadata = Vec::with_capacity(rasters.len());
    let mut checked = Vec::with_capacity(rasters.len());
    let mut excluded = Vec::new();
    for (position, path) in rasters.iter().enumerate() {
        let report = inspect_with_limit(path, config.max_decode_bytes).report;
        match report.metadata {
            Some(m) if report.verdict.is_usable() => {
                metadata.push(m);
                checked.push((position, path.as_path()));
            }
            _ => {
                info!(path = %path.display(), verdict = %report.verdict, "Excluded from check");
                excluded.push((position, path.as_path(), report.verdict.to_string()));
            }
        }
    }

    let report = check_consistency_with_tolerance(&metadata, config.resolution_tolerance);
    print!("{}", output::format_check(&report, &checked, &excluded));
    if report.compared == 0 {
        bail!("No usable rasters to compare");
    }
    if !report.passed {
        bail!("{} raster(s) disagree with the first", report.discrepancies.len());
    }
    Ok(())
}

struct RunArgs {
    watershed: PathBuf,
    attribute: String,
    value: String,
    rasters: Vec<PathBuf>,
    dem: Option<PathBuf>,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
    config: ZonalConfig,
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let layer = WatershedLayer::from_path(&args.watershed)
        .with_context(|| format!("Failed to load {}", args.watershed.display()))?;
    let basin = layer.select(&args.attribute, &args.value)?;

    let inputs: Vec<RasterInput> = collect_rasters(&args.rasters)?
        .into_iter()
        .map(RasterInput::from_path)
        .collect();
    info!(
        rasters = inputs.len(),
        watershed = %args.value,
        parallel = args.config.parallel,
        "Starting batch"
    );

    let progress: &ProgressFn = &|done, total, label| {
        info!(done, total, file = %label, "Processed raster");
    };
    let pipeline = BatchPipeline::new(args.config).with_progress(progress);
    let mut analysis = pipeline.run_analysis(&basin, &inputs, args.dem.as_deref());

    if !sort_chronologically(&mut analysis.batch.results) {
        info!("Month labels are not all MM-YYYY, keeping input order");
    }

    print!("{}", output::format_batch(&analysis.batch));
    let seasons = SeasonalSummary::from_results(&analysis.batch.results);
    if !seasons.is_empty() {
        println!();
        print!("{}", output::format_seasons(&seasons));
    }
    if let Some(summary) = &analysis.elevation {
        println!();
        print!("{}", output::format_elevation(summary));
    }
    if let Some(err) = &analysis.elevation_error {
        println!("DEM not summarized: {}", err);
    }

    if let Some(path) = &args.csv {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        zonal_stats::write_csv(&analysis.batch.results, BufWriter::new(file))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote CSV");
    }

    if let Some(path) = &args.json {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &analysis)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote JSON report");
    }

    if analysis.batch.status == BatchStatus::AllSkipped {
        bail!("Every raster was skipped");
    }
    Ok(())
}

fn cmd_dem(path: &Path, config: &ZonalConfig) -> Result<()> {
    let summary = summarize_dem_with_limit(path, config.max_decode_bytes)
        .with_context(|| format!("Failed to summarize {}", path.display()))?;
    print!("{}", output::format_elevation(&summary));
    Ok(())
}

fn cmd_regions(path: &Path, attribute: Option<&str>) -> Result<()> {
    let layer = WatershedLayer::from_path(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let values = match attribute {
        Some(column) => layer.attribute_values(column),
        None => layer.attribute_columns(),
    };
    if values.is_empty() {
        bail!("Nothing to list in {}", path.display());
    }
    for value in values {
        println!("{}", value);
    }
    Ok(())
}
