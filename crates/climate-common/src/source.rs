//! Temperature grid sources.
//!
//! A [`GridSource`] exposes the coordinate labels of a temperature grid
//! eagerly and its values lazily, one time slab at a time. Reductions
//! iterate over [`GridSource::time_chunks`] so that no more than one slab
//! per worker is resident in memory.

use std::ops::Range;
use std::sync::Arc;

use crate::error::{ClimateError, Result};
use crate::grid::GridAxes;
use crate::units::TemperatureUnit;

/// Default number of time steps read per slab.
pub const DEFAULT_TIME_CHUNK: usize = 200;

/// A lazily evaluated `{time, lat, lon}` temperature grid.
pub trait GridSource: Send + Sync {
    /// Coordinate labels of the grid.
    fn axes(&self) -> &GridAxes;

    /// Name of the temperature variable.
    fn variable(&self) -> &str;

    /// Unit of the values returned by [`read_time_slab`](Self::read_time_slab).
    fn units(&self) -> TemperatureUnit;

    /// Preferred number of time steps per slab.
    fn time_chunk(&self) -> usize {
        DEFAULT_TIME_CHUNK
    }

    /// Read the values for time steps `range`, laid out `[time][lat][lon]`.
    ///
    /// Missing samples are returned as NaN.
    fn read_time_slab(&self, range: Range<usize>) -> Result<Vec<f32>>;

    /// Slab ranges covering the whole time axis.
    fn time_chunks(&self) -> Vec<Range<usize>> {
        let n = self.axes().times.len();
        let step = self.time_chunk().max(1);
        (0..n)
            .step_by(step)
            .map(|start| start..(start + step).min(n))
            .collect()
    }
}

/// Check a requested slab against the time axis length.
pub fn check_slab(range: &Range<usize>, len: usize) -> Result<()> {
    if range.start > range.end || range.end > len {
        return Err(ClimateError::validation(
            "time range",
            format!("{:?} is outside the time axis 0..{}", range, len),
        ));
    }
    Ok(())
}

/// A grid held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryGrid {
    axes: GridAxes,
    values: Vec<f32>,
    units: TemperatureUnit,
    variable: String,
    time_chunk: usize,
}

impl InMemoryGrid {
    /// Create a grid from row-major `[time][lat][lon]` values.
    pub fn new(
        axes: GridAxes,
        values: Vec<f32>,
        units: TemperatureUnit,
        variable: impl Into<String>,
    ) -> Result<Self> {
        let (nt, ny, nx) = axes.shape();
        if values.len() != nt * ny * nx {
            return Err(ClimateError::schema(format!(
                "expected {} values for shape ({}, {}, {}), got {}",
                nt * ny * nx,
                nt,
                ny,
                nx,
                values.len()
            )));
        }
        Ok(Self {
            axes,
            values,
            units,
            variable: variable.into(),
            time_chunk: DEFAULT_TIME_CHUNK,
        })
    }

    /// Override the slab size used by reductions.
    pub fn with_time_chunk(mut self, time_chunk: usize) -> Self {
        self.time_chunk = time_chunk.max(1);
        self
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

impl GridSource for InMemoryGrid {
    fn axes(&self) -> &GridAxes {
        &self.axes
    }

    fn variable(&self) -> &str {
        &self.variable
    }

    fn units(&self) -> TemperatureUnit {
        self.units
    }

    fn time_chunk(&self) -> usize {
        self.time_chunk
    }

    fn read_time_slab(&self, range: Range<usize>) -> Result<Vec<f32>> {
        check_slab(&range, self.axes.times.len())?;
        let cells = self.axes.cells();
        Ok(self.values[range.start * cells..range.end * cells].to_vec())
    }
}

/// Presents another source's values in a target unit.
///
/// The wrapped source is never modified; values are converted as slabs
/// are read.
pub struct UnitView {
    inner: Arc<dyn GridSource>,
    target: TemperatureUnit,
}

impl UnitView {
    /// Wrap `inner` so that it reads in `target` units.
    ///
    /// A source already in `target` units is returned unchanged, so
    /// applying the same view twice never converts twice.
    pub fn wrap(inner: Arc<dyn GridSource>, target: TemperatureUnit) -> Arc<dyn GridSource> {
        if inner.units() == target {
            return inner;
        }
        tracing::debug!(
            variable = inner.variable(),
            from = %inner.units(),
            to = %target,
            "Converting temperature units"
        );
        Arc::new(Self { inner, target })
    }
}

impl GridSource for UnitView {
    fn axes(&self) -> &GridAxes {
        self.inner.axes()
    }

    fn variable(&self) -> &str {
        self.inner.variable()
    }

    fn units(&self) -> TemperatureUnit {
        self.target
    }

    fn time_chunk(&self) -> usize {
        self.inner.time_chunk()
    }

    fn read_time_slab(&self, range: Range<usize>) -> Result<Vec<f32>> {
        let mut values = self.inner.read_time_slab(range)?;
        self.inner.units().convert_slice(&mut values, self.target);
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn grid(nt: usize) -> InMemoryGrid {
        let times = (0..nt)
            .map(|d| {
                NaiveDate::from_ymd_opt(1948, 1, 1 + d as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            })
            .collect();
        let axes = GridAxes::new(times, vec![10.0, 0.0], vec![0.0, 5.0]).unwrap();
        let values = (0..nt * 4).map(|i| 270.0 + i as f32).collect();
        InMemoryGrid::new(axes, values, TemperatureUnit::Kelvin, "air").unwrap()
    }

    #[test]
    fn test_rejects_wrong_value_count() {
        let axes = grid(2).axes().clone();
        let err = InMemoryGrid::new(axes, vec![0.0; 3], TemperatureUnit::Kelvin, "air").unwrap_err();
        assert_eq!(err.code(), "SchemaError");
    }

    #[test]
    fn test_time_chunks_cover_axis() {
        let g = grid(5).with_time_chunk(2);
        assert_eq!(g.time_chunks(), vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn test_read_slab() {
        let g = grid(3);
        let slab = g.read_time_slab(1..2).unwrap();
        assert_eq!(slab, vec![274.0, 275.0, 276.0, 277.0]);
        assert!(g.read_time_slab(2..4).is_err());
    }

    #[test]
    fn test_unit_view_converts_without_mutating() {
        let base: Arc<dyn GridSource> = Arc::new(grid(1));
        let view = UnitView::wrap(base.clone(), TemperatureUnit::Celsius);
        assert_eq!(view.units(), TemperatureUnit::Celsius);
        let c = view.read_time_slab(0..1).unwrap();
        assert!((c[0] - (270.0 - 273.15)).abs() < 1e-4);
        assert_eq!(base.read_time_slab(0..1).unwrap()[0], 270.0);
    }

    #[test]
    fn test_unit_view_is_idempotent() {
        let base: Arc<dyn GridSource> = Arc::new(grid(1));
        let once = UnitView::wrap(base, TemperatureUnit::Celsius);
        let twice = UnitView::wrap(once.clone(), TemperatureUnit::Celsius);
        assert_eq!(
            once.read_time_slab(0..1).unwrap(),
            twice.read_time_slab(0..1).unwrap()
        );
    }
}
