//! Command-line front end for the climate baseline toolkit.
//!
//! Loads gridded temperature data, prints whole-grid statistics, derives
//! the yearly average, baseline and anomaly products, and queries the
//! persisted products at a location.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use climate_common::TemperatureUnit;
use climatology::{Artifact, ClimateConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use commands::Statistic;

#[derive(Parser, Debug)]
#[command(name = "climate")]
#[command(about = "Climate baseline and anomaly toolkit for gridded temperature data")]
struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, global = true, env = "CLIMATE_CONFIG")]
    config: Option<PathBuf>,

    /// Input files, directories, wildcard patterns or URLs
    #[arg(short, long, global = true, num_args = 1..)]
    data: Vec<String>,

    /// Directory holding the derived products
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Temperature variable name in the input files
    #[arg(long, global = true)]
    variable: Option<String>,

    /// Unit for statistics and products: kelvin or celsius
    #[arg(short, long, global = true)]
    units: Option<String>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format: json or text
    #[arg(long, global = true, default_value = "json")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mean temperature over the whole grid
    Mean,

    /// Maximum temperature over the whole grid
    Max,

    /// Minimum temperature over the whole grid
    Min,

    /// Mean, minimum and maximum in one pass
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save the yearly average and the baseline for a period
    Baseline(PeriodArgs),

    /// Save the yearly average, the baseline and the anomaly for a period
    Anomaly(PeriodArgs),

    /// Anomaly series at the grid point nearest to a location
    LocationAnomaly(LocationArgs),

    /// Baseline series at the grid point nearest to a location
    LocationBaseline(LocationArgs),
}

/// Baseline period; bounds default to the configured baseline domain.
#[derive(Args, Debug, Clone, Copy)]
struct PeriodArgs {
    /// First year of the baseline period
    #[arg(long)]
    start: Option<i32>,

    /// Last year of the baseline period
    #[arg(long)]
    end: Option<i32>,
}

#[derive(Args, Debug, Clone, Copy)]
struct LocationArgs {
    /// Latitude in degrees north
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude in degrees east
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format)?;

    let config = resolve_config(&cli)?;
    info!(
        data = ?config.data,
        output_dir = %config.output_dir.display(),
        units = %config.units,
        baseline_domain = %config.baseline_domain,
        "Loaded configuration"
    );

    match cli.command {
        Command::Mean => commands::statistic(&config, Statistic::Mean).await,
        Command::Max => commands::statistic(&config, Statistic::Max).await,
        Command::Min => commands::statistic(&config, Statistic::Min).await,
        Command::Stats { json } => commands::stats(&config, json).await,
        Command::Baseline(p) => commands::derive(&config, p.start, p.end, false).await,
        Command::Anomaly(p) => commands::derive(&config, p.start, p.end, true).await,
        Command::LocationAnomaly(l) => {
            commands::location(&config, Artifact::TemperatureAnomaly, l.lat, l.lon, l.json).await
        }
        Command::LocationBaseline(l) => {
            commands::location(&config, Artifact::Baseline, l.lat, l.lon, l.json).await
        }
    }
}

/// Install the global subscriber. Logs go to stderr; results to stdout.
fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if log_format.eq_ignore_ascii_case("text") {
        tracing::subscriber::set_global_default(builder.finish())?;
    } else {
        let subscriber = builder.with_thread_ids(true).json().finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Defaults, then the YAML file, then the environment, then flags.
fn resolve_config(cli: &Cli) -> Result<ClimateConfig> {
    let mut config = ClimateConfig::load(cli.config.as_deref())?;

    if !cli.data.is_empty() {
        config.data = cli.data.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(variable) = &cli.variable {
        config.variable = variable.clone();
    }
    if let Some(units) = &cli.units {
        config.units = TemperatureUnit::parse(units)
            .with_context(|| format!("unknown units '{}' (expected kelvin or celsius)", units))?;
    }

    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}
