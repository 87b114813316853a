//! Yearly averages, baseline climatology and anomalies.
//!
//! A [`ClimatologySession`] owns one temperature source and memoizes each
//! derived product for the rest of the run. Stages never derive their
//! inputs implicitly: asking for a baseline before the yearly average, or
//! an anomaly before the baseline, is a `PrerequisiteError`.
//! [`ClimatologySession::compute_and_save`] runs the stages in order.

use std::sync::Arc;

use chrono::Datelike;
use climate_common::{distinct_years, ClimateError, GridSource, Result, TemperatureUnit, UnitView};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{ClimateConfig, YearRange};
use crate::stats::summarize;
use crate::store::ProductStore;
use crate::types::{Artifact, DerivedProduct, GridSummary};

/// Per-(year, cell) sums and counts of valid samples.
#[derive(Debug, Clone)]
struct YearAccumulator {
    sums: Vec<f64>,
    counts: Vec<u32>,
}

impl YearAccumulator {
    fn new(years: usize, cells: usize) -> Self {
        Self {
            sums: vec![0.0; years * cells],
            counts: vec![0; years * cells],
        }
    }

    fn add_step(&mut self, year_idx: usize, step: &[f32]) {
        let base = year_idx * step.len();
        for (i, &v) in step.iter().enumerate() {
            if !v.is_nan() {
                self.sums[base + i] += v as f64;
                self.counts[base + i] += 1;
            }
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.sums.iter_mut().zip(&other.sums) {
            *a += b;
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self
    }

    fn means(&self) -> Vec<f32> {
        self.sums
            .iter()
            .zip(&self.counts)
            .map(|(&s, &c)| if c == 0 { f32::NAN } else { (s / c as f64) as f32 })
            .collect()
    }
}

/// Stateful climatology pipeline over one temperature source.
pub struct ClimatologySession {
    source: Option<Arc<dyn GridSource>>,
    units: TemperatureUnit,
    baseline_domain: YearRange,
    summary: Option<GridSummary>,
    yearly: Option<DerivedProduct>,
    baseline: Option<DerivedProduct>,
    anomaly: Option<DerivedProduct>,
}

impl ClimatologySession {
    /// Create an empty session producing values in `units`.
    pub fn new(units: TemperatureUnit, baseline_domain: YearRange) -> Self {
        Self {
            source: None,
            units,
            baseline_domain,
            summary: None,
            yearly: None,
            baseline: None,
            anomaly: None,
        }
    }

    pub fn from_config(config: &ClimateConfig) -> Self {
        Self::new(config.units, config.baseline_domain)
    }

    /// Attach a source, discarding anything derived from a previous one.
    pub fn load(&mut self, source: Arc<dyn GridSource>) {
        let (nt, ny, nx) = source.axes().shape();
        info!(
            variable = source.variable(),
            times = nt,
            lats = ny,
            lons = nx,
            units = %self.units,
            "Loaded temperature grid"
        );
        self.source = Some(UnitView::wrap(source, self.units));
        self.summary = None;
        self.yearly = None;
        self.baseline = None;
        self.anomaly = None;
    }

    pub fn with_source(mut self, source: Arc<dyn GridSource>) -> Self {
        self.load(source);
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    pub fn units(&self) -> TemperatureUnit {
        self.units
    }

    pub fn baseline_domain(&self) -> YearRange {
        self.baseline_domain
    }

    fn source(&self) -> Result<&Arc<dyn GridSource>> {
        self.source
            .as_ref()
            .ok_or_else(|| ClimateError::not_loaded("load a temperature dataset first"))
    }

    // === Statistics ===

    /// Mean, min and max of the whole grid from one pass.
    pub fn summary(&mut self) -> Result<GridSummary> {
        if let Some(summary) = self.summary {
            return Ok(summary);
        }
        let summary = summarize(self.source()?.as_ref())?;
        self.summary = Some(summary);
        Ok(summary)
    }

    pub fn mean(&mut self) -> Result<f64> {
        Ok(self.summary()?.mean)
    }

    pub fn max(&mut self) -> Result<f64> {
        Ok(self.summary()?.max)
    }

    pub fn min(&mut self) -> Result<f64> {
        Ok(self.summary()?.min)
    }

    // === Pipeline stages ===

    /// Mean over all timestamps of each calendar year, per cell.
    pub fn yearly_average(&mut self) -> Result<&DerivedProduct> {
        let product = match self.yearly.take() {
            Some(p) => p,
            None => compute_yearly(self.source()?.as_ref(), self.units)?,
        };
        Ok(self.yearly.insert(product))
    }

    /// Check a baseline period against the configured domain.
    pub fn validate_period(&self, start: i32, end: i32) -> Result<YearRange> {
        let domain = self.baseline_domain;
        if !domain.contains(start) || !domain.contains(end) {
            return Err(ClimateError::validation(
                "baseline period",
                format!(
                    "years must lie within {}, got {}-{}",
                    domain, start, end
                ),
            ));
        }
        if start > end {
            return Err(ClimateError::validation(
                "baseline period",
                format!("start year {} is after end year {}", start, end),
            ));
        }
        Ok(YearRange::new(start, end))
    }

    /// Mean of the yearly average over `start..=end`, per cell.
    ///
    /// Requires [`yearly_average`](Self::yearly_average) to have run. A
    /// cached baseline for the same period is reused; a different period
    /// replaces it and drops any anomaly derived from the old one.
    pub fn baseline(&mut self, start: i32, end: i32) -> Result<&DerivedProduct> {
        let period = self.validate_period(start, end)?;
        let yearly = self.yearly.as_ref().ok_or_else(|| {
            ClimateError::prerequisite(
                Artifact::YearlyAverage.name(),
                "compute the yearly average before the baseline",
            )
        })?;
        check_covered(yearly, period)?;

        let product = match self.baseline.take() {
            Some(b) if b.baseline_period == Some(period) => b,
            previous => {
                if previous.is_some() {
                    debug!(period = %period, "Baseline period changed, dropping cached anomaly");
                    self.anomaly = None;
                }
                compute_baseline(yearly, period)?
            }
        };
        Ok(self.baseline.insert(product))
    }

    /// Yearly average minus baseline, per year and cell.
    pub fn anomaly(&mut self) -> Result<&DerivedProduct> {
        let product = match self.anomaly.take() {
            Some(a) => a,
            None => {
                let yearly = self.yearly.as_ref().ok_or_else(|| {
                    ClimateError::prerequisite(
                        Artifact::YearlyAverage.name(),
                        "compute the yearly average before the anomaly",
                    )
                })?;
                let baseline = self.baseline.as_ref().ok_or_else(|| {
                    ClimateError::prerequisite(
                        Artifact::Baseline.name(),
                        "compute the baseline before the anomaly",
                    )
                })?;
                compute_anomaly(yearly, baseline)?
            }
        };
        Ok(self.anomaly.insert(product))
    }

    // === Orchestration ===

    /// Derive yearly average, baseline and optionally the anomaly, then
    /// replace the store's contents with them.
    ///
    /// The period is validated before anything is read or written.
    pub fn compute_and_save(
        &mut self,
        store: &dyn ProductStore,
        start: i32,
        end: i32,
        include_anomaly: bool,
    ) -> Result<Vec<Artifact>> {
        self.validate_period(start, end)?;
        self.source()?;

        let mut products = vec![self.yearly_average()?.clone()];
        products.push(self.baseline(start, end)?.clone());
        if include_anomaly {
            products.push(self.anomaly()?.clone());
        }

        store.write(&products)?;
        let written: Vec<Artifact> = products.iter().map(|p| p.artifact).collect();
        info!(
            period = %YearRange::new(start, end),
            artifacts = ?written.iter().map(Artifact::name).collect::<Vec<_>>(),
            "Saved climatology products"
        );
        Ok(written)
    }

    /// Save `yearly_average` and `baseline`.
    pub fn compute_and_save_baseline(
        &mut self,
        store: &dyn ProductStore,
        start: i32,
        end: i32,
    ) -> Result<Vec<Artifact>> {
        self.compute_and_save(store, start, end, false)
    }

    /// Save `yearly_average`, `baseline` and `temperature_anomaly`.
    pub fn compute_and_save_anomaly(
        &mut self,
        store: &dyn ProductStore,
        start: i32,
        end: i32,
    ) -> Result<Vec<Artifact>> {
        self.compute_and_save(store, start, end, true)
    }
}

// =============================================================================
// Reductions
// =============================================================================

fn compute_yearly(source: &dyn GridSource, units: TemperatureUnit) -> Result<DerivedProduct> {
    let axes = source.axes();
    let years = distinct_years(&axes.times);
    let year_of: Vec<usize> = axes
        .times
        .iter()
        .map(|t| years.binary_search(&t.year()).unwrap_or(0))
        .collect();
    let cells = axes.cells();
    let n_years = years.len();

    let acc = source
        .time_chunks()
        .into_par_iter()
        .try_fold(
            || YearAccumulator::new(n_years, cells),
            |mut acc, range| -> Result<YearAccumulator> {
                let slab = source.read_time_slab(range.clone())?;
                for (k, t) in range.enumerate() {
                    acc.add_step(year_of[t], &slab[k * cells..(k + 1) * cells]);
                }
                Ok(acc)
            },
        )
        .try_reduce(|| YearAccumulator::new(n_years, cells), |a, b| Ok(a.merge(b)))?;

    info!(years = n_years, cells = cells, "Computed yearly average");
    DerivedProduct::new(
        Artifact::YearlyAverage,
        units,
        years,
        axes.lats.clone(),
        axes.lons.clone(),
        acc.means(),
        None,
    )
}

/// The period must lie inside the years of the yearly average.
fn check_covered(yearly: &DerivedProduct, period: YearRange) -> Result<()> {
    let covered = match (yearly.years.first(), yearly.years.last()) {
        (Some(&first), Some(&last)) => first <= period.start && period.end <= last,
        _ => false,
    };
    if !covered || !yearly.years.iter().any(|&y| period.contains(y)) {
        return Err(ClimateError::validation(
            "baseline period",
            format!(
                "{} is outside the years present in the data: {:?}",
                period, yearly.years
            ),
        ));
    }
    Ok(())
}

fn compute_baseline(yearly: &DerivedProduct, period: YearRange) -> Result<DerivedProduct> {
    let selected: Vec<usize> = yearly
        .years
        .iter()
        .enumerate()
        .filter(|(_, y)| period.contains(**y))
        .map(|(i, _)| i)
        .collect();

    let cells = yearly.cells();
    let field: Vec<f32> = (0..cells)
        .into_par_iter()
        .map(|cell| {
            let (sum, count) = selected.iter().fold((0.0f64, 0u32), |(s, c), &y| {
                let v = yearly.values[y * cells + cell];
                if v.is_nan() {
                    (s, c)
                } else {
                    (s + v as f64, c + 1)
                }
            });
            if count == 0 {
                f32::NAN
            } else {
                (sum / count as f64) as f32
            }
        })
        .collect();

    info!(period = %period, years = selected.len(), cells = cells, "Computed baseline");

    let values = field.repeat(yearly.years.len());
    DerivedProduct::new(
        Artifact::Baseline,
        yearly.units,
        yearly.years.clone(),
        yearly.lats.clone(),
        yearly.lons.clone(),
        values,
        Some(period),
    )
}

fn compute_anomaly(yearly: &DerivedProduct, baseline: &DerivedProduct) -> Result<DerivedProduct> {
    if yearly.shape() != baseline.shape() || yearly.units != baseline.units {
        return Err(ClimateError::schema(format!(
            "baseline shape {:?} ({}) does not match yearly average {:?} ({})",
            baseline.shape(),
            baseline.units,
            yearly.shape(),
            yearly.units
        )));
    }

    let values: Vec<f32> = yearly
        .values
        .par_iter()
        .zip(baseline.values.par_iter())
        .map(|(&y, &b)| y - b)
        .collect();

    info!(years = yearly.years.len(), cells = yearly.cells(), "Computed anomaly");
    DerivedProduct::new(
        Artifact::TemperatureAnomaly,
        yearly.units,
        yearly.years.clone(),
        yearly.lats.clone(),
        yearly.lons.clone(),
        values,
        baseline.baseline_period,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_accumulator_merge_and_nan() {
        let mut a = YearAccumulator::new(2, 2);
        a.add_step(0, &[1.0, f32::NAN]);
        let mut b = YearAccumulator::new(2, 2);
        b.add_step(0, &[3.0, f32::NAN]);
        b.add_step(1, &[5.0, 6.0]);
        let means = a.merge(b).means();
        assert_eq!(means[0], 2.0);
        assert!(means[1].is_nan());
        assert_eq!(&means[2..], &[5.0, 6.0]);
    }

    #[test]
    fn test_not_loaded() {
        let mut session = ClimatologySession::new(TemperatureUnit::Kelvin, YearRange::default());
        assert_eq!(session.mean().unwrap_err().code(), "NotLoadedError");
        assert_eq!(session.yearly_average().unwrap_err().code(), "NotLoadedError");
    }

    #[test]
    fn test_validate_period_order_of_checks() {
        let session = ClimatologySession::new(TemperatureUnit::Kelvin, YearRange::default());
        assert!(session.validate_period(1948, 1957).is_ok());
        let err = session.validate_period(1960, 1970).unwrap_err();
        assert!(err.to_string().contains("within 1948-1957"));
        let err = session.validate_period(1955, 1950).unwrap_err();
        assert!(err.to_string().contains("after end year"));
        // both rules broken: the domain is reported first
        let err = session.validate_period(1958, 1940).unwrap_err();
        assert!(err.to_string().contains("within"));
    }

    #[test]
    fn test_baseline_without_yearly_is_prerequisite() {
        let mut session = ClimatologySession::new(TemperatureUnit::Kelvin, YearRange::default());
        let err = session.baseline(1948, 1950).unwrap_err();
        assert_eq!(err.code(), "PrerequisiteError");
        assert!(err.to_string().contains("yearly_average"));
    }
}
