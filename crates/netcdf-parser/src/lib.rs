//! NetCDF reader for gridded temperature reanalysis data.
//!
//! This crate turns file paths, directories, wildcard patterns and URLs into
//! a [`NetCdfSource`], a lazily read `{time, lat, lon}` temperature grid that
//! implements [`climate_common::GridSource`].
//!
//! # Implementation Notes
//!
//! Reading goes through the native netcdf library (which wraps HDF5).
//! Opening a source reads coordinates and attributes only; temperature
//! values are read per time slab when a reduction asks for them.

pub mod discovery;
pub mod error;
pub mod fetch;
pub mod native;
pub mod source;

pub use discovery::{resolve_locations, Location};
pub use error::{NetCdfError, NetCdfResult};
pub use native::{read_file_info, silence_hdf5_errors, FileInfo, Packing};
pub use source::{NetCdfLoader, NetCdfSource};
