//! Command implementations.

use std::sync::Arc;

use anyhow::Result;
use climate_common::ClimateError;
use climatology::{
    location_anomaly, location_baseline, Artifact, ClimateConfig, ClimatologySession,
    GridSummary, LocationSeries, ZarrProductStore,
};
use netcdf_parser::NetCdfLoader;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub enum Statistic {
    Mean,
    Max,
    Min,
}

/// Run CPU-bound work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> climate_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Open the configured inputs and attach them to `session`.
async fn load_into(session: &mut ClimatologySession, config: &ClimateConfig) -> Result<()> {
    let loader = NetCdfLoader::new(config.variable.clone(), config.time_chunk);
    let source = loader
        .load(&config.data)
        .await
        .map_err(ClimateError::from)?;

    let paths = source.paths();
    info!(files = paths.len(), variable = %config.variable, "Data loaded");
    println!("Data loaded from {} file(s):", paths.len());
    for path in &paths {
        println!("  {}", path.display());
    }

    session.load(Arc::new(source));
    Ok(())
}

pub async fn statistic(config: &ClimateConfig, which: Statistic) -> Result<()> {
    let summary = summarize(config).await?;
    let (label, value) = match which {
        Statistic::Mean => ("Mean", summary.mean),
        Statistic::Max => ("Maximum", summary.max),
        Statistic::Min => ("Minimum", summary.min),
    };
    println!("{} temperature: {:.2} {}", label, value, summary.units);
    Ok(())
}

pub async fn stats(config: &ClimateConfig, json: bool) -> Result<()> {
    let summary = summarize(config).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Mean temperature:    {:.2} {}", summary.mean, summary.units);
        println!("Minimum temperature: {:.2} {}", summary.min, summary.units);
        println!("Maximum temperature: {:.2} {}", summary.max, summary.units);
        println!("Valid samples:       {}", summary.count);
    }
    Ok(())
}

async fn summarize(config: &ClimateConfig) -> Result<GridSummary> {
    let mut session = ClimatologySession::from_config(config);
    load_into(&mut session, config).await?;
    blocking(move || session.summary()).await
}

/// Derive and save the products for a baseline period.
///
/// The period is checked before any input is opened.
pub async fn derive(
    config: &ClimateConfig,
    start: Option<i32>,
    end: Option<i32>,
    include_anomaly: bool,
) -> Result<()> {
    let start = start.unwrap_or(config.baseline_domain.start);
    let end = end.unwrap_or(config.baseline_domain.end);

    let mut session = ClimatologySession::from_config(config);
    session.validate_period(start, end)?;
    load_into(&mut session, config).await?;

    let store = ZarrProductStore::new(config);
    let (store, written) = blocking(move || {
        let written = session.compute_and_save(&store, start, end, include_anomaly)?;
        Ok((store, written))
    })
    .await?;

    println!("Baseline period {}-{} ({})", start, end, config.units);
    for artifact in written {
        println!("  {:<20} {}", artifact, store.artifact_path(artifact).display());
    }
    Ok(())
}

/// Print the series of `artifact` nearest to (`lat`, `lon`).
///
/// Failures are reported on stderr and do not fail the process.
pub async fn location(
    config: &ClimateConfig,
    artifact: Artifact,
    lat: f64,
    lon: f64,
    json: bool,
) -> Result<()> {
    let store = ZarrProductStore::new(config);
    let result = blocking(move || match artifact {
        Artifact::Baseline => location_baseline(&store, lat, lon),
        _ => location_anomaly(&store, lat, lon),
    })
    .await;

    match result {
        Ok(series) if json => println!("{}", serde_json::to_string_pretty(&series)?),
        Ok(series) => print_series(&series),
        Err(e) => {
            warn!(error = %e, artifact = %artifact, lat = lat, lon = lon, "Location query failed");
            eprintln!("Error: {}", e);
        }
    }
    Ok(())
}

fn print_series(series: &LocationSeries) {
    println!(
        "{} at lat {:.3}, lon {:.3} (nearest to {}, {})",
        series.variable, series.grid_lat, series.grid_lon, series.requested_lat, series.requested_lon
    );
    for (year, value) in series.years.iter().zip(&series.values) {
        println!("  {}  {:>9.3} {}", year, value, series.units);
    }
}
