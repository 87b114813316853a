//! Artifact persistence and nearest-grid-point queries.

use std::sync::atomic::{AtomicUsize, Ordering};

use climate_common::{Result, TemperatureUnit};
use climatology::{
    location_anomaly, location_baseline, query, Artifact, ClimateConfig, DerivedProduct,
    ProductStore, YearRange, ZarrCompression, ZarrProductStore,
};
use test_utils::{coords, temp_test_dir_with_prefix};

fn product(artifact: Artifact, lats: &[f64], lons: &[f64]) -> DerivedProduct {
    let years = vec![1948, 1949, 1950];
    let n = years.len() * lats.len() * lons.len();
    DerivedProduct::new(
        artifact,
        TemperatureUnit::Kelvin,
        years,
        lats.to_vec(),
        lons.to_vec(),
        (0..n).map(|i| 250.0 + i as f32 * 0.5).collect(),
        Some(YearRange::new(1948, 1950)),
    )
    .unwrap()
}

fn positive_products() -> Vec<DerivedProduct> {
    Artifact::ALL
        .iter()
        .map(|&a| product(a, &coords::LATS, &coords::LONS_POSITIVE))
        .collect()
}

/// Store wrapper counting reads, to check validation happens first.
struct CountingStore<S> {
    inner: S,
    reads: AtomicUsize,
}

impl<S: ProductStore> ProductStore for CountingStore<S> {
    fn write(&self, products: &[DerivedProduct]) -> Result<()> {
        self.inner.write(products)
    }

    fn read(&self, artifact: Artifact) -> Result<DerivedProduct> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(artifact)
    }

    fn clear(&self) -> Result<usize> {
        self.inner.clear()
    }

    fn exists(&self, artifact: Artifact) -> bool {
        self.inner.exists(artifact)
    }
}

#[test]
fn test_round_trip_each_codec() {
    for compression in [
        ZarrCompression::None,
        ZarrCompression::BloscLz4,
        ZarrCompression::BloscZstd,
    ] {
        let dir = temp_test_dir_with_prefix("climate_store_");
        let config = ClimateConfig {
            zarr_compression: compression,
            zarr_chunk_size: 2,
            ..Default::default()
        };
        let store = ZarrProductStore::at(dir.path(), &config);
        let products = positive_products();
        store.write(&products).unwrap();

        for expected in &products {
            let read = store.read(expected.artifact).unwrap();
            assert_eq!(&read, expected, "codec {}", compression);
        }
    }
}

#[test]
fn test_nan_values_survive() {
    let dir = temp_test_dir_with_prefix("climate_nan_");
    let store = ZarrProductStore::at(dir.path(), &ClimateConfig::default());
    let mut p = product(Artifact::YearlyAverage, &[0.0], &[0.0, 1.0]);
    p.values[1] = f32::NAN;
    store.write(std::slice::from_ref(&p)).unwrap();

    let read = store.read(Artifact::YearlyAverage).unwrap();
    assert!(read.values[1].is_nan());
    assert_eq!(read.values[0], p.values[0]);
}

#[test]
fn test_missing_artifact_message() {
    let dir = temp_test_dir_with_prefix("climate_missing_");
    let store = ZarrProductStore::at(dir.path(), &ClimateConfig::default());
    let err = store.read(Artifact::Baseline).unwrap_err();
    assert_eq!(err.code(), "NotFoundError");
    let msg = err.to_string();
    assert!(msg.contains("baseline.zarr"), "{}", msg);
    assert!(msg.contains("run `climate baseline` or `climate anomaly` first"), "{}", msg);

    let err = store.read_named("climatology").unwrap_err();
    assert_eq!(err.code(), "NotFoundError");
}

#[test]
fn test_query_exact_grid_point() {
    let dir = temp_test_dir_with_prefix("climate_query_");
    let store = ZarrProductStore::at(dir.path(), &ClimateConfig::default());
    let products = positive_products();
    store.write(&products).unwrap();

    let series = location_anomaly(&store, 45.0, 90.0).unwrap();
    assert_eq!(series.grid_lat, 45.0);
    assert_eq!(series.grid_lon, 90.0);
    assert_eq!(series.years, vec![1948, 1949, 1950]);
    assert_eq!(series.values, products[2].series_at(1, 2));
    assert_eq!(series.units, TemperatureUnit::Kelvin);
}

#[test]
fn test_query_midpoint_prefers_lower_coordinate() {
    let dir = temp_test_dir_with_prefix("climate_tie_");
    let store = ZarrProductStore::at(dir.path(), &ClimateConfig::default());
    let products = positive_products();
    store.write(&products).unwrap();

    // halfway between lat 45 and 0, and between lon 0 and 45
    let series = location_baseline(&store, 22.5, 22.5).unwrap();
    assert_eq!(series.grid_lat, 0.0);
    assert_eq!(series.grid_lon, 0.0);
    assert_eq!(series.values, products[1].series_at(2, 0));
}

#[test]
fn test_query_negative_longitude_on_positive_grid() {
    let dir = temp_test_dir_with_prefix("climate_lon_");
    let store = ZarrProductStore::at(dir.path(), &ClimateConfig::default());
    store.write(&positive_products()).unwrap();

    let series = location_anomaly(&store, -45.0, -90.0).unwrap();
    assert_eq!(series.grid_lon, 270.0);
    assert_eq!(series.requested_lon, -90.0);
    assert_eq!(series.grid_lat, -45.0);
}

#[test]
fn test_query_signed_grid() {
    let dir = temp_test_dir_with_prefix("climate_signed_");
    let store = ZarrProductStore::at(dir.path(), &ClimateConfig::default());
    let p = product(Artifact::TemperatureAnomaly, &coords::LATS, &coords::LONS_SIGNED);
    store.write(std::slice::from_ref(&p)).unwrap();

    let series = location_anomaly(&store, 0.0, -100.0).unwrap();
    assert_eq!(series.grid_lon, -135.0);
    assert_eq!(series.values, p.series_at(2, 0));
}

#[test]
fn test_invalid_coordinates_rejected_before_store_access() {
    let dir = temp_test_dir_with_prefix("climate_validate_");
    let store = CountingStore {
        inner: ZarrProductStore::at(dir.path(), &ClimateConfig::default()),
        reads: AtomicUsize::new(0),
    };

    let err = location_anomaly(&store, 100.0, 0.0).unwrap_err();
    assert_eq!(err.code(), "ValidationError");
    let err = location_baseline(&store, 0.0, 200.0).unwrap_err();
    assert_eq!(err.code(), "ValidationError");
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);

    // valid coordinates reach the store, which has nothing yet
    let err = location_anomaly(&store, 0.0, 0.0).unwrap_err();
    assert_eq!(err.code(), "NotFoundError");
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_query_variable_mismatch_is_schema_error() {
    let dir = temp_test_dir_with_prefix("climate_variable_");
    let store = ZarrProductStore::at(dir.path(), &ClimateConfig::default());
    store.write(&positive_products()).unwrap();

    let err = query(&store, "baseline", "air", 0.0, 0.0).unwrap_err();
    assert_eq!(err.code(), "SchemaError");
    assert!(err.to_string().contains("baseline_temperature"));

    let ok = query(&store, "yearly_average", "yearly_mean_temperature", 0.0, 0.0).unwrap();
    assert_eq!(ok.artifact, Artifact::YearlyAverage);
}
