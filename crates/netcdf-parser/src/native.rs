//! Native NetCDF reading using the netcdf library.
//!
//! Opening a file only reads coordinate variables and attributes. Values of
//! the temperature variable are read later, one time slab at a time, with
//! CF packing (`scale_factor`, `add_offset`) applied and missing samples
//! (`_FillValue`, `missing_value`) mapped to NaN.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Once;

use chrono::NaiveDateTime;
use climate_common::{CfTimeUnits, TemperatureUnit};
use tracing::{debug, warn};

use crate::error::{NetCdfError, NetCdfResult};

const TIME_NAMES: &[&str] = &["time"];
const LAT_NAMES: &[&str] = &["lat", "latitude"];
const LON_NAMES: &[&str] = &["lon", "longitude"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostics even for errors the Rust side
/// handles, such as probing for optional attributes. Safe to call more
/// than once; call it before the first file is opened.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable automatic error printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// CF packing and missing-value attributes of a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
    pub fill_value: Option<f64>,
    pub missing_value: Option<f64>,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            add_offset: 0.0,
            fill_value: None,
            missing_value: None,
        }
    }
}

impl Packing {
    /// Unpack one raw sample.
    pub fn apply(&self, raw: f64) -> f32 {
        if raw.is_nan()
            || self.fill_value.is_some_and(|f| raw == f)
            || self.missing_value.is_some_and(|m| raw == m)
        {
            return f32::NAN;
        }
        (raw * self.scale_factor + self.add_offset) as f32
    }
}

/// Coordinates and attributes of one NetCDF file.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub variable: String,
    pub times: Vec<NaiveDateTime>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub units: TemperatureUnit,
    pub packing: Packing,
}

/// Read coordinates and attributes of `variable` from a file.
pub fn read_file_info(path: &Path, variable: &str) -> NetCdfResult<FileInfo> {
    silence_hdf5_errors();

    let file = netcdf::open(path).map_err(|e| {
        NetCdfError::InvalidFormat(format!("failed to open {}: {}", path.display(), e))
    })?;

    let var = file.variable(variable).ok_or_else(|| {
        let available: Vec<String> = file.variables().map(|v| v.name()).collect();
        NetCdfError::MissingData(format!(
            "variable '{}' not found in {} (available: {})",
            variable,
            path.display(),
            available.join(", ")
        ))
    })?;

    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    if dims.len() != 3
        || !TIME_NAMES.contains(&dims[0].as_str())
        || !LAT_NAMES.contains(&dims[1].as_str())
        || !LON_NAMES.contains(&dims[2].as_str())
    {
        return Err(NetCdfError::MissingData(format!(
            "variable '{}' in {} must have dimensions (time, lat, lon), found ({})",
            variable,
            path.display(),
            dims.join(", ")
        )));
    }

    let times = read_time_axis(&file, &dims[0], path)?;
    let lats = read_coordinate(&file, &dims[1], path)?;
    let lons = read_coordinate(&file, &dims[2], path)?;

    let units = match get_string_attr(&var, "units") {
        None => TemperatureUnit::Kelvin,
        Some(u) => TemperatureUnit::parse(&u).unwrap_or_else(|| {
            warn!(units = %u, path = %path.display(), "Unrecognised temperature units, assuming Kelvin");
            TemperatureUnit::Kelvin
        }),
    };

    let packing = Packing {
        scale_factor: get_f64_attr(&var, "scale_factor").unwrap_or(1.0),
        add_offset: get_f64_attr(&var, "add_offset").unwrap_or(0.0),
        fill_value: get_f64_attr(&var, "_FillValue"),
        missing_value: get_f64_attr(&var, "missing_value"),
    };

    debug!(
        path = %path.display(),
        times = times.len(),
        lats = lats.len(),
        lons = lons.len(),
        units = %units,
        "Read NetCDF metadata"
    );

    Ok(FileInfo {
        path: path.to_path_buf(),
        variable: variable.to_string(),
        times,
        lats,
        lons,
        units,
        packing,
    })
}

/// Read time steps `range` of the file's temperature variable.
///
/// Values are unpacked and laid out `[time][lat][lon]`.
pub fn read_slab(info: &FileInfo, range: Range<usize>) -> NetCdfResult<Vec<f32>> {
    silence_hdf5_errors();

    let file = netcdf::open(&info.path).map_err(|e| {
        NetCdfError::InvalidFormat(format!("failed to open {}: {}", info.path.display(), e))
    })?;
    let var = file.variable(&info.variable).ok_or_else(|| {
        NetCdfError::MissingData(format!(
            "variable '{}' disappeared from {}",
            info.variable,
            info.path.display()
        ))
    })?;

    let raw: Vec<f64> = var
        .get_values::<f64, _>((range.clone(), .., ..))
        .map_err(|e| {
            NetCdfError::InvalidFormat(format!(
                "failed to read {}[{:?}] from {}: {}",
                info.variable,
                range,
                info.path.display(),
                e
            ))
        })?;

    Ok(raw.into_iter().map(|v| info.packing.apply(v)).collect())
}

// =============================================================================
// Internal helpers
// =============================================================================

fn read_coordinate(file: &netcdf::File, name: &str, path: &Path) -> NetCdfResult<Vec<f64>> {
    let var = file.variable(name).ok_or_else(|| {
        NetCdfError::MissingData(format!(
            "coordinate variable '{}' not found in {}",
            name,
            path.display()
        ))
    })?;
    var.get_values::<f64, _>(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("failed to read '{}': {}", name, e)))
}

fn read_time_axis(
    file: &netcdf::File,
    name: &str,
    path: &Path,
) -> NetCdfResult<Vec<NaiveDateTime>> {
    let raw = read_coordinate(file, name, path)?;
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("time variable '{}'", name)))?;

    let units = get_string_attr(&var, "units").ok_or_else(|| {
        NetCdfError::MissingData(format!(
            "time variable '{}' in {} has no units attribute",
            name,
            path.display()
        ))
    })?;
    let calendar = get_string_attr(&var, "calendar");

    let cf = CfTimeUnits::parse(&units, calendar.as_deref())
        .map_err(|e| NetCdfError::InvalidFormat(format!("{} in {}", e, path.display())))?;

    raw.into_iter()
        .map(|v| {
            cf.decode(v).map_err(|e| {
                NetCdfError::InvalidFormat(format!(
                    "time variable '{}' in {}: {}",
                    name,
                    path.display(),
                    e
                ))
            })
        })
        .collect()
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        netcdf::AttributeValue::Strs(v) => v.into_iter().next(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing_default_is_identity() {
        let p = Packing::default();
        assert_eq!(p.apply(287.5), 287.5);
        assert!(p.apply(f64::NAN).is_nan());
    }

    #[test]
    fn test_packing_scale_offset_and_missing() {
        let p = Packing {
            scale_factor: 0.01,
            add_offset: 300.0,
            fill_value: Some(32767.0),
            missing_value: Some(-32767.0),
        };
        assert!((p.apply(-1000.0) - 290.0).abs() < 1e-4);
        assert!(p.apply(32767.0).is_nan());
        assert!(p.apply(-32767.0).is_nan());
    }
}
