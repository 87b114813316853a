//! Nearest-grid-point lookups in persisted products.
//!
//! # Examples
//!
//! ```no_run
//! use climatology::{location_anomaly, ClimateConfig, ZarrProductStore};
//!
//! let config = ClimateConfig::default();
//! let store = ZarrProductStore::new(&config);
//! let series = location_anomaly(&store, 51.5, -0.1).unwrap();
//! for (year, value) in series.years.iter().zip(&series.values) {
//!     println!("{year}: {value:+.2} {}", series.units);
//! }
//! ```

use climate_common::{nearest_index, ClimateError, LonConvention, Result, TemperatureUnit};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::ProductStore;
use crate::types::Artifact;

/// Year-indexed series at one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSeries {
    pub artifact: Artifact,
    pub variable: String,
    pub units: TemperatureUnit,
    /// Coordinates that were asked for.
    pub requested_lat: f64,
    pub requested_lon: f64,
    /// Coordinates of the grid point that was selected.
    pub grid_lat: f64,
    pub grid_lon: f64,
    pub years: Vec<i32>,
    pub values: Vec<f32>,
}

/// Check a coordinate pair is a valid geographic location.
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ClimateError::validation(
            "latitude",
            format!("{} is outside [-90, 90]", lat),
        ));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ClimateError::validation(
            "longitude",
            format!("{} is outside [-180, 180]", lon),
        ));
    }
    Ok(())
}

/// Series of `variable` in artifact `name` at the grid point nearest to
/// (`lat`, `lon`).
///
/// Coordinates are validated before the store is touched. Each axis is
/// matched independently; on an exact midpoint the lower coordinate wins.
pub fn query(
    store: &dyn ProductStore,
    name: &str,
    variable: &str,
    lat: f64,
    lon: f64,
) -> Result<LocationSeries> {
    validate_coordinates(lat, lon)?;

    let product = store.read_named(name)?;
    if product.variable != variable {
        return Err(ClimateError::schema(format!(
            "artifact '{}' has no variable '{}' (available: {})",
            name, variable, product.variable
        )));
    }

    let grid_lon_target = LonConvention::detect(&product.lons).normalize(lon);
    let lat_idx = nearest_index(&product.lats, lat)
        .ok_or_else(|| ClimateError::schema(format!("artifact '{}' has no latitudes", name)))?;
    let lon_idx = nearest_index(&product.lons, grid_lon_target)
        .ok_or_else(|| ClimateError::schema(format!("artifact '{}' has no longitudes", name)))?;

    debug!(
        artifact = name,
        lat = lat,
        lon = lon,
        grid_lat = product.lats[lat_idx],
        grid_lon = product.lons[lon_idx],
        "Selected nearest grid point"
    );

    Ok(LocationSeries {
        artifact: product.artifact,
        values: product.series_at(lat_idx, lon_idx),
        grid_lat: product.lats[lat_idx],
        grid_lon: product.lons[lon_idx],
        requested_lat: lat,
        requested_lon: lon,
        variable: product.variable,
        units: product.units,
        years: product.years,
    })
}

/// Anomaly series at the grid point nearest to (`lat`, `lon`).
pub fn location_anomaly(store: &dyn ProductStore, lat: f64, lon: f64) -> Result<LocationSeries> {
    let artifact = Artifact::TemperatureAnomaly;
    query(store, artifact.name(), artifact.variable(), lat, lon)
}

/// Baseline series at the grid point nearest to (`lat`, `lon`).
pub fn location_baseline(store: &dyn ProductStore, lat: f64, lon: f64) -> Result<LocationSeries> {
    let artifact = Artifact::Baseline;
    query(store, artifact.name(), artifact.variable(), lat, lon)
}
