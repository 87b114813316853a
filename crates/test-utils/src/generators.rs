//! Test data generators for synthetic temperature grids.
//!
//! These generators create predictable, verifiable patterns whose yearly
//! averages and baselines can be worked out by hand.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use climate_common::{GridAxes, InMemoryGrid, TemperatureUnit};

/// Timestamps for `steps_per_year` samples in each year of
/// `start_year..=end_year`, 30 days apart starting on 1 January.
///
/// `steps_per_year` must be between 1 and 12 so that every sample stays in
/// its own year.
pub fn yearly_times(start_year: i32, end_year: i32, steps_per_year: usize) -> Vec<NaiveDateTime> {
    assert!((1..=12).contains(&steps_per_year), "steps_per_year must be 1..=12");
    let mut times = Vec::new();
    for year in start_year..=end_year {
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time");
        for step in 0..steps_per_year {
            times.push(jan1 + Duration::days(30 * step as i64));
        }
    }
    times
}

/// Axes covering `start_year..=end_year` on the given lat/lon labels.
pub fn grid_axes(
    start_year: i32,
    end_year: i32,
    steps_per_year: usize,
    lats: &[f64],
    lons: &[f64],
) -> GridAxes {
    GridAxes::new(
        yearly_times(start_year, end_year, steps_per_year),
        lats.to_vec(),
        lons.to_vec(),
    )
    .expect("valid test axes")
}

/// Build a Kelvin grid of variable `air` from a per-sample function
/// `f(time, lat_index, lon_index)`.
pub fn grid_from_fn(axes: GridAxes, f: impl Fn(NaiveDateTime, usize, usize) -> f32) -> InMemoryGrid {
    let mut values = Vec::with_capacity(axes.times.len() * axes.cells());
    for &t in &axes.times {
        for i in 0..axes.lats.len() {
            for j in 0..axes.lons.len() {
                values.push(f(t, i, j));
            }
        }
    }
    InMemoryGrid::new(axes, values, TemperatureUnit::Kelvin, "air").expect("valid test grid")
}

/// A grid holding `value` everywhere.
pub fn create_constant_grid(axes: GridAxes, value: f32) -> InMemoryGrid {
    grid_from_fn(axes, |_, _, _| value)
}

/// A grid whose value rises by one Kelvin per year and varies by cell.
///
/// `value = 280 + (year - first_year) + 2 * lat_index + lon_index`, so the
/// yearly average of a cell equals its value in that year.
pub fn create_year_ramp_grid(axes: GridAxes) -> InMemoryGrid {
    let first_year = axes.times[0].year();
    grid_from_fn(axes, move |t, i, j| {
        280.0 + (t.year() - first_year) as f32 + 2.0 * i as f32 + j as f32
    })
}

/// A year ramp with a within-year cycle of +/-5 K on alternating samples.
///
/// With an even number of samples per year the yearly averages match
/// [`create_year_ramp_grid`].
pub fn create_seasonal_grid(axes: GridAxes) -> InMemoryGrid {
    let first_year = axes.times[0].year();
    grid_from_fn(axes, move |t, i, j| {
        let season = if (t.ordinal0() / 30) % 2 == 0 { 5.0 } else { -5.0 };
        280.0 + (t.year() - first_year) as f32 + 2.0 * i as f32 + j as f32 + season
    })
}

/// Replace every `every`-th value with NaN, starting at index `offset`.
pub fn punch_nans(values: &mut [f32], offset: usize, every: usize) {
    for v in values.iter_mut().skip(offset).step_by(every.max(1)) {
        *v = f32::NAN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::GridSource;

    #[test]
    fn test_yearly_times_stay_in_year() {
        let times = yearly_times(1948, 1949, 12);
        assert_eq!(times.len(), 24);
        assert!(times[..12].iter().all(|t| t.year() == 1948));
        assert!(times[12..].iter().all(|t| t.year() == 1949));
    }

    #[test]
    fn test_year_ramp_values() {
        let axes = grid_axes(1948, 1950, 2, &[10.0, 0.0], &[0.0, 5.0, 10.0]);
        let grid = create_year_ramp_grid(axes);
        let values = grid.values();
        assert_eq!(values[0], 280.0);
        // year 1950, second sample, lat 1, lon 2
        assert_eq!(values[5 * 6 + 3 + 2], 286.0);
    }

    #[test]
    fn test_seasonal_grid_averages_out() {
        let axes = grid_axes(1948, 1948, 4, &[0.0], &[0.0]);
        let grid = create_seasonal_grid(axes);
        let slab = grid.read_time_slab(0..4).unwrap();
        assert_eq!(slab.iter().sum::<f32>() / 4.0, 280.0);
    }

    #[test]
    fn test_punch_nans() {
        let mut v = vec![1.0; 6];
        punch_nans(&mut v, 1, 2);
        assert!(v[1].is_nan() && v[3].is_nan() && v[5].is_nan());
        assert_eq!(v[0], 1.0);
    }
}
