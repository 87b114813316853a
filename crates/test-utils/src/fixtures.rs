//! Common test fixtures for climate statistics tests.

use std::path::Path;

use chrono::NaiveDate;
use climate_common::{GridSource, InMemoryGrid};

/// Default baseline interval of the reanalysis record.
pub mod period {
    pub const BASELINE_START: i32 = 1948;
    pub const BASELINE_END: i32 = 1957;
}

/// Coarse coordinate labels for small synthetic grids.
pub mod coords {
    /// Descending latitudes, as stored by reanalysis products.
    pub const LATS: [f64; 5] = [90.0, 45.0, 0.0, -45.0, -90.0];

    /// Longitudes in the [0, 360) convention.
    pub const LONS_POSITIVE: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

    /// Longitudes in the [-180, 180] convention.
    pub const LONS_SIGNED: [f64; 4] = [-135.0, -45.0, 45.0, 135.0];
}

/// Reference of the time axis written by [`NetCdfFixture`].
pub const TIME_UNITS: &str = "hours since 1800-01-01 00:00:0.0";

/// CF packing used for `short` fixtures.
#[derive(Debug, Clone, Copy)]
pub struct ShortPacking {
    pub scale_factor: f32,
    pub add_offset: f32,
    pub fill_value: i16,
}

impl Default for ShortPacking {
    fn default() -> Self {
        Self {
            scale_factor: 0.01,
            add_offset: 300.0,
            fill_value: 32767,
        }
    }
}

/// A small NetCDF temperature file built from an in-memory grid.
#[derive(Debug, Clone)]
pub struct NetCdfFixture {
    pub variable: String,
    pub units: Option<String>,
    pub calendar: Option<String>,
    pub packing: Option<ShortPacking>,
    /// Raw time values written in place of the encoded timestamps.
    pub raw_times: Vec<(usize, f64)>,
    grid: InMemoryGrid,
}

impl NetCdfFixture {
    pub fn from_grid(grid: InMemoryGrid) -> Self {
        Self {
            variable: "air".to_string(),
            units: Some("degK".to_string()),
            calendar: Some("standard".to_string()),
            packing: None,
            raw_times: Vec::new(),
            grid,
        }
    }

    pub fn with_variable(mut self, variable: &str) -> Self {
        self.variable = variable.to_string();
        self
    }

    pub fn with_calendar(mut self, calendar: Option<&str>) -> Self {
        self.calendar = calendar.map(str::to_string);
        self
    }

    pub fn packed(mut self, packing: ShortPacking) -> Self {
        self.packing = Some(packing);
        self
    }

    /// Overwrite time step `index` with a raw offset, e.g. a fill value.
    pub fn with_raw_time(mut self, index: usize, value: f64) -> Self {
        self.raw_times.push((index, value));
        self
    }

    /// Write the fixture as `(time, lat, lon)` with CF coordinate variables.
    pub fn write(&self, path: &Path) -> Result<(), netcdf::Error> {
        let axes = self.grid.axes();
        let (nt, ny, nx) = axes.shape();
        let reference = NaiveDate::from_ymd_opt(1800, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid reference");
        let mut hours: Vec<f64> = axes
            .times
            .iter()
            .map(|t| (*t - reference).num_seconds() as f64 / 3600.0)
            .collect();
        for &(index, value) in &self.raw_times {
            hours[index] = value;
        }

        let mut file = netcdf::create(path)?;
        file.add_dimension("time", nt)?;
        file.add_dimension("lat", ny)?;
        file.add_dimension("lon", nx)?;

        {
            let mut var = file.add_variable::<f64>("time", &["time"])?;
            var.put_attribute("units", TIME_UNITS)?;
            if let Some(cal) = &self.calendar {
                var.put_attribute("calendar", cal.as_str())?;
            }
            var.put_values(&hours, ..)?;
        }
        {
            let mut var = file.add_variable::<f64>("lat", &["lat"])?;
            var.put_attribute("units", "degrees_north")?;
            var.put_values(&axes.lats, ..)?;
        }
        {
            let mut var = file.add_variable::<f64>("lon", &["lon"])?;
            var.put_attribute("units", "degrees_east")?;
            var.put_values(&axes.lons, ..)?;
        }

        let values = self.grid.values();
        match self.packing {
            None => {
                let mut var = file.add_variable::<f32>(&self.variable, &["time", "lat", "lon"])?;
                if let Some(units) = &self.units {
                    var.put_attribute("units", units.as_str())?;
                }
                var.put_values(values, (.., .., ..))?;
            }
            Some(p) => {
                let raw: Vec<i16> = values
                    .iter()
                    .map(|&v| {
                        if v.is_nan() {
                            p.fill_value
                        } else {
                            ((v - p.add_offset) / p.scale_factor).round() as i16
                        }
                    })
                    .collect();
                let mut var = file.add_variable::<i16>(&self.variable, &["time", "lat", "lon"])?;
                var.put_attribute("_FillValue", p.fill_value)?;
                var.put_attribute("scale_factor", p.scale_factor)?;
                var.put_attribute("add_offset", p.add_offset)?;
                if let Some(units) = &self.units {
                    var.put_attribute("units", units.as_str())?;
                }
                var.put_values(&raw, (.., .., ..))?;
            }
        }
        Ok(())
    }
}
