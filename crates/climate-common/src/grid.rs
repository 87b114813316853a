//! Coordinate axes for gridded temperature data.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, Result};

/// Labels of a `{time, lat, lon}` temperature grid.
///
/// Values belonging to these axes are laid out row-major as
/// `[time][lat][lon]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxes {
    pub times: Vec<NaiveDateTime>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

impl GridAxes {
    /// Create a set of axes, checking the grid invariants.
    ///
    /// All label sets must be non-empty and the time axis must be strictly
    /// increasing.
    pub fn new(times: Vec<NaiveDateTime>, lats: Vec<f64>, lons: Vec<f64>) -> Result<Self> {
        if times.is_empty() || lats.is_empty() || lons.is_empty() {
            return Err(ClimateError::schema(format!(
                "grid axes must be non-empty (time={}, lat={}, lon={})",
                times.len(),
                lats.len(),
                lons.len()
            )));
        }
        if let Some(w) = times.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ClimateError::schema(format!(
                "time axis is not strictly increasing at {} -> {}",
                w[0], w[1]
            )));
        }
        Ok(Self { times, lats, lons })
    }

    /// Number of spatial cells (lat x lon).
    pub fn cells(&self) -> usize {
        self.lats.len() * self.lons.len()
    }

    /// Shape as (time, lat, lon).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.lats.len(), self.lons.len())
    }
}

/// Index of the coordinate nearest to `target`.
///
/// On an exact midpoint between two coordinates the one with the lower
/// coordinate value wins, independent of axis direction.
pub fn nearest_index(coords: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &c) in coords.iter().enumerate() {
        let dist = (c - target).abs();
        best = match best {
            None => Some((i, dist)),
            Some((bi, bd)) => {
                if dist < bd || (dist == bd && c < coords[bi]) {
                    Some((i, dist))
                } else {
                    Some((bi, bd))
                }
            }
        };
    }
    best.map(|(i, _)| i)
}

/// Longitude convention used by a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LonConvention {
    /// Longitudes in [-180, 180].
    Signed,
    /// Longitudes in [0, 360).
    Positive,
}

impl LonConvention {
    /// Infer the convention from a longitude axis.
    pub fn detect(lons: &[f64]) -> Self {
        if lons.iter().any(|&l| l > 180.0) {
            LonConvention::Positive
        } else {
            LonConvention::Signed
        }
    }

    /// Map a longitude in [-180, 180] onto this convention.
    pub fn normalize(&self, lon: f64) -> f64 {
        match self {
            LonConvention::Positive if lon < 0.0 => lon + 360.0,
            _ => lon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(y: i32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_axes_reject_empty() {
        let err = GridAxes::new(vec![], vec![0.0], vec![0.0]).unwrap_err();
        assert_eq!(err.code(), "SchemaError");
    }

    #[test]
    fn test_axes_reject_unordered_time() {
        let err = GridAxes::new(vec![t(1949, 1), t(1948, 1)], vec![0.0], vec![0.0]).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn test_axes_shape() {
        let axes = GridAxes::new(vec![t(1948, 1)], vec![0.0, 1.0], vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(axes.shape(), (1, 2, 3));
        assert_eq!(axes.cells(), 6);
    }

    #[test]
    fn test_nearest_exact_point() {
        assert_eq!(nearest_index(&[0.0, 2.5, 5.0], 2.5), Some(1));
    }

    #[test]
    fn test_nearest_midpoint_prefers_lower_value() {
        assert_eq!(nearest_index(&[0.0, 2.5, 5.0], 1.25), Some(0));
        // descending latitude axis, as in reanalysis files
        assert_eq!(nearest_index(&[90.0, 87.5, 85.0], 88.75), Some(1));
    }

    #[test]
    fn test_nearest_empty() {
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn test_lon_convention() {
        let conv = LonConvention::detect(&[0.0, 90.0, 180.0, 270.0]);
        assert_eq!(conv, LonConvention::Positive);
        assert_eq!(conv.normalize(-90.0), 270.0);
        assert_eq!(LonConvention::Signed.normalize(-90.0), -90.0);
    }
}
