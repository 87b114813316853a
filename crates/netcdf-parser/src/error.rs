//! Error types for NetCDF parsing operations.

use climate_common::ClimateError;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No input matched the requested locations
    #[error("No NetCDF input found: {0}")]
    NotFound(String),

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Remote download failed
    #[error("Remote fetch failed: {0}")]
    Remote(String),
}

impl From<NetCdfError> for ClimateError {
    fn from(err: NetCdfError) -> Self {
        match err {
            NetCdfError::NotFound(msg) => ClimateError::NotFound(msg),
            NetCdfError::MissingData(msg) => ClimateError::Schema(msg),
            NetCdfError::InvalidFormat(msg) => ClimateError::Schema(msg),
            NetCdfError::IoError(e) => ClimateError::Io(e.to_string()),
            NetCdfError::Remote(msg) => ClimateError::Remote(msg),
        }
    }
}

impl From<netcdf::Error> for NetCdfError {
    fn from(err: netcdf::Error) -> Self {
        NetCdfError::InvalidFormat(err.to_string())
    }
}
