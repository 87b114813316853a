//! Integration tests for reading NetCDF temperature files.

use climate_common::{ClimateError, GridSource, TemperatureUnit};
use netcdf_parser::{NetCdfError, NetCdfLoader};
use test_utils::{
    assert_approx_eq, coords, create_year_ramp_grid, grid_axes, punch_nans, require_test_file,
    temp_test_dir_with_prefix, NetCdfFixture, ShortPacking,
};

fn loader() -> NetCdfLoader {
    NetCdfLoader::new("air", 3)
}

#[test]
fn test_open_single_file() {
    let dir = temp_test_dir_with_prefix("nc_single_");
    let path = dir.path().join("air.2m.gauss.1948.nc");
    let grid = create_year_ramp_grid(grid_axes(1948, 1949, 4, &coords::LATS, &coords::LONS_POSITIVE));
    NetCdfFixture::from_grid(grid.clone()).write(&path).unwrap();

    let source = loader().open(&[path.to_string_lossy().to_string()]).unwrap();
    assert_eq!(source.axes(), grid.axes());
    assert_eq!(source.units(), TemperatureUnit::Kelvin);
    assert_eq!(source.variable(), "air");
    assert_eq!(source.time_chunks().len(), 3);

    let slab = source.read_time_slab(2..5).unwrap();
    let cells = grid.axes().cells();
    assert_eq!(slab, grid.values()[2 * cells..5 * cells].to_vec());
}

#[test]
fn test_pattern_concatenates_files_in_time_order() {
    let dir = temp_test_dir_with_prefix("nc_multi_");
    for year in [1949, 1948, 1950] {
        let grid = create_year_ramp_grid(grid_axes(year, year, 2, &coords::LATS, &coords::LONS_SIGNED));
        NetCdfFixture::from_grid(grid)
            .write(&dir.path().join(format!("air.2m.gauss.{}.nc", year)))
            .unwrap();
    }

    let pattern = dir.path().join("air.2m.gauss.*.nc").to_string_lossy().to_string();
    let source = loader().open(&[pattern]).unwrap();
    assert_eq!(source.paths().len(), 3);
    assert_eq!(source.axes().times.len(), 6);
    assert!(source.axes().times.windows(2).all(|w| w[0] < w[1]));

    // Slab straddling the 1948/1949 file boundary
    let slab = source.read_time_slab(1..3).unwrap();
    assert_eq!(slab.len(), 2 * source.axes().cells());
}

#[test]
fn test_packed_values_and_fill() {
    let dir = temp_test_dir_with_prefix("nc_packed_");
    let path = dir.path().join("packed.nc");
    let axes = grid_axes(1948, 1948, 2, &[0.0, 10.0], &[0.0, 10.0]);
    let grid = create_year_ramp_grid(axes.clone());
    let mut values = grid.values().to_vec();
    punch_nans(&mut values, 0, 5);
    let grid = climate_common::InMemoryGrid::new(axes, values.clone(), TemperatureUnit::Kelvin, "air").unwrap();
    NetCdfFixture::from_grid(grid)
        .packed(ShortPacking::default())
        .write(&path)
        .unwrap();

    let source = loader().open(&[path.to_string_lossy().to_string()]).unwrap();
    let read = source.read_time_slab(0..2).unwrap();
    for (expected, got) in values.iter().zip(&read) {
        if expected.is_nan() {
            assert!(got.is_nan());
        } else {
            assert_approx_eq!(*got, *expected, 0.01);
        }
    }
}

#[test]
fn test_missing_variable_is_schema_error() {
    let dir = temp_test_dir_with_prefix("nc_schema_");
    let path = dir.path().join("other.nc");
    let grid = create_year_ramp_grid(grid_axes(1948, 1948, 1, &[0.0], &[0.0]));
    NetCdfFixture::from_grid(grid).with_variable("tmp").write(&path).unwrap();

    let err = loader().open(&[path.to_string_lossy().to_string()]).unwrap_err();
    assert!(matches!(err, NetCdfError::MissingData(_)));
    let err = ClimateError::from(err);
    assert_eq!(err.code(), "SchemaError");
    assert!(err.to_string().contains("tmp"), "should list available variables: {}", err);
}

#[test]
fn test_unsupported_calendar_is_schema_error() {
    let dir = temp_test_dir_with_prefix("nc_calendar_");
    let path = dir.path().join("noleap.nc");
    let grid = create_year_ramp_grid(grid_axes(1948, 1948, 1, &[0.0], &[0.0]));
    NetCdfFixture::from_grid(grid)
        .with_calendar(Some("noleap"))
        .write(&path)
        .unwrap();

    let err = ClimateError::from(loader().open(&[path.to_string_lossy().to_string()]).unwrap_err());
    assert_eq!(err.code(), "SchemaError");
}

#[test]
fn test_fill_value_in_time_axis_is_schema_error() {
    let dir = temp_test_dir_with_prefix("nc_time_fill_");
    let path = dir.path().join("unwritten.nc");
    let grid = create_year_ramp_grid(grid_axes(1948, 1948, 4, &[0.0], &[0.0]));
    NetCdfFixture::from_grid(grid)
        .with_raw_time(3, 9.969209968386869e36)
        .write(&path)
        .unwrap();

    let err = ClimateError::from(loader().open(&[path.to_string_lossy().to_string()]).unwrap_err());
    assert_eq!(err.code(), "SchemaError");
    assert!(err.to_string().contains("not representable"));
}

#[test]
fn test_no_matching_files_is_not_found() {
    let dir = temp_test_dir_with_prefix("nc_empty_");
    let pattern = dir.path().join("air.2m.gauss.*.nc").to_string_lossy().to_string();
    let err = ClimateError::from(loader().open(&[pattern]).unwrap_err());
    assert_eq!(err.code(), "NotFoundError");
}

#[test]
fn test_mismatched_grids_rejected() {
    let dir = temp_test_dir_with_prefix("nc_mismatch_");
    let a = create_year_ramp_grid(grid_axes(1948, 1948, 1, &[0.0], &[0.0, 10.0]));
    let b = create_year_ramp_grid(grid_axes(1949, 1949, 1, &[0.0], &[0.0, 20.0]));
    NetCdfFixture::from_grid(a).write(&dir.path().join("a.nc")).unwrap();
    NetCdfFixture::from_grid(b).write(&dir.path().join("b.nc")).unwrap();

    let err = loader().open(&[dir.path().to_string_lossy().to_string()]).unwrap_err();
    assert!(matches!(err, NetCdfError::MissingData(_)));
}

#[tokio::test]
async fn test_async_load_local_inputs() {
    let dir = temp_test_dir_with_prefix("nc_async_");
    let path = dir.path().join("air.nc");
    let grid = create_year_ramp_grid(grid_axes(1948, 1950, 1, &[0.0], &[0.0]));
    NetCdfFixture::from_grid(grid).write(&path).unwrap();

    let source = loader().load(&[path.to_string_lossy().to_string()]).await.unwrap();
    assert_eq!(source.axes().times.len(), 3);
}

#[test]
fn test_reanalysis_file_if_present() {
    let path = require_test_file!("air.2m.gauss.1948.nc");
    let source = loader().open(&[path.to_string_lossy().to_string()]).unwrap();
    let (nt, ny, nx) = source.axes().shape();
    assert!(nt > 0 && ny > 0 && nx > 0);
    let slab = source.read_time_slab(0..1).unwrap();
    assert!(slab.iter().filter(|v| v.is_finite()).all(|v| (150.0..350.0).contains(v)));
}
