//! Common types and utilities shared across the climate toolkit crates.

pub mod error;
pub mod grid;
pub mod source;
pub mod time;
pub mod units;

pub use error::{ClimateError, Result};
pub use grid::{nearest_index, GridAxes, LonConvention};
pub use source::{GridSource, InMemoryGrid, UnitView, DEFAULT_TIME_CHUNK};
pub use time::{distinct_years, CfTimeUnits, TimeParseError, TimeStep};
pub use units::{TemperatureUnit, KELVIN_OFFSET};
