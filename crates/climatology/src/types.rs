//! Core types for derived climatology products.

use std::fmt;

use climate_common::{ClimateError, Result, TemperatureUnit};
use serde::{Deserialize, Serialize};

use crate::config::YearRange;

/// Persisted artifact names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    YearlyAverage,
    Baseline,
    TemperatureAnomaly,
}

impl Artifact {
    pub const ALL: [Artifact; 3] = [
        Artifact::YearlyAverage,
        Artifact::Baseline,
        Artifact::TemperatureAnomaly,
    ];

    /// Name of the artifact in the output store.
    pub fn name(&self) -> &'static str {
        match self {
            Artifact::YearlyAverage => "yearly_average",
            Artifact::Baseline => "baseline",
            Artifact::TemperatureAnomaly => "temperature_anomaly",
        }
    }

    /// Name of the single variable the artifact holds.
    pub fn variable(&self) -> &'static str {
        match self {
            Artifact::YearlyAverage => "yearly_mean_temperature",
            Artifact::Baseline => "baseline_temperature",
            Artifact::TemperatureAnomaly => "temperature_anomaly",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `{year, lat, lon}` array derived from a temperature grid.
///
/// Values are row-major `[year][lat][lon]`. The baseline is stored
/// broadcast over the same year axis as the yearly average it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedProduct {
    pub artifact: Artifact,
    pub variable: String,
    pub units: TemperatureUnit,
    pub years: Vec<i32>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub values: Vec<f32>,
    pub baseline_period: Option<YearRange>,
}

impl DerivedProduct {
    /// Create a product, checking the value count matches the labels.
    pub fn new(
        artifact: Artifact,
        units: TemperatureUnit,
        years: Vec<i32>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        values: Vec<f32>,
        baseline_period: Option<YearRange>,
    ) -> Result<Self> {
        let expected = years.len() * lats.len() * lons.len();
        if values.len() != expected {
            return Err(ClimateError::schema(format!(
                "{} expects {} values for shape ({}, {}, {}), got {}",
                artifact,
                expected,
                years.len(),
                lats.len(),
                lons.len(),
                values.len()
            )));
        }
        Ok(Self {
            artifact,
            variable: artifact.variable().to_string(),
            units,
            years,
            lats,
            lons,
            values,
            baseline_period,
        })
    }

    /// Shape as (year, lat, lon).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.years.len(), self.lats.len(), self.lons.len())
    }

    /// Number of spatial cells.
    pub fn cells(&self) -> usize {
        self.lats.len() * self.lons.len()
    }

    /// Values of one year, laid out `[lat][lon]`.
    pub fn year_slice(&self, year: i32) -> Option<&[f32]> {
        let idx = self.years.iter().position(|&y| y == year)?;
        let cells = self.cells();
        Some(&self.values[idx * cells..(idx + 1) * cells])
    }

    /// Series over years at one grid cell.
    pub fn series_at(&self, lat_idx: usize, lon_idx: usize) -> Vec<f32> {
        let cells = self.cells();
        let offset = lat_idx * self.lons.len() + lon_idx;
        (0..self.years.len())
            .map(|y| self.values[y * cells + offset])
            .collect()
    }
}

/// Whole-grid summary statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Number of valid (non-NaN) samples.
    pub count: u64,
    pub units: TemperatureUnit,
}
