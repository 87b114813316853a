//! Climate baseline and anomaly computation.
//!
//! This crate derives climatology products from a gridded temperature
//! source and persists them as Zarr V3 arrays.
//!
//! # Overview
//!
//! - [`stats`]: mean, min and max of the whole grid in one pass
//! - [`pipeline`]: yearly averages, baseline over a year range, anomalies
//! - [`store`]: the [`ProductStore`] seam and its Zarr implementation
//! - [`query`]: nearest-grid-point series from persisted products
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use climatology::{ClimateConfig, ClimatologySession, ZarrProductStore};
//! # fn source() -> Arc<dyn climate_common::GridSource> { unimplemented!() }
//!
//! let config = ClimateConfig::default();
//! let store = ZarrProductStore::new(&config);
//! let mut session = ClimatologySession::from_config(&config).with_source(source());
//! session.compute_and_save_anomaly(&store, 1948, 1957)?;
//! # Ok::<(), climate_common::ClimateError>(())
//! ```

pub mod config;
pub mod pipeline;
pub mod query;
pub mod stats;
pub mod store;
pub mod types;

pub use config::{ClimateConfig, YearRange, ZarrCompression};
pub use pipeline::ClimatologySession;
pub use query::{location_anomaly, location_baseline, query, validate_coordinates, LocationSeries};
pub use stats::summarize;
pub use store::{ArtifactAttributes, ProductStore, ZarrProductStore};
pub use types::{Artifact, DerivedProduct, GridSummary};
