//! Temperature units.

use serde::{Deserialize, Serialize};

/// Offset between the Kelvin and Celsius scales.
pub const KELVIN_OFFSET: f32 = 273.15;

/// Unit of a temperature field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Native unit of reanalysis products.
    #[default]
    Kelvin,
    Celsius,
}

impl TemperatureUnit {
    /// Parse a unit name or a CF `units` attribute (case-insensitive).
    ///
    /// Returns `None` for anything that is not a recognised temperature unit.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "k" | "kelvin" | "degk" | "deg_k" | "degrees_kelvin" => Some(Self::Kelvin),
            "c" | "celsius" | "degc" | "deg_c" | "degrees_celsius" | "degree_celsius" => {
                Some(Self::Celsius)
            }
            _ => None,
        }
    }

    /// Symbol used in persisted attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kelvin => "K",
            Self::Celsius => "degC",
        }
    }

    /// Convert a single value from `self` into `target`.
    ///
    /// Converting into the same unit returns the value unchanged.
    #[inline]
    pub fn convert(&self, value: f32, target: TemperatureUnit) -> f32 {
        match (self, target) {
            (Self::Kelvin, Self::Celsius) => value - KELVIN_OFFSET,
            (Self::Celsius, Self::Kelvin) => value + KELVIN_OFFSET,
            _ => value,
        }
    }

    /// Convert a buffer in place from `self` into `target`.
    pub fn convert_slice(&self, values: &mut [f32], target: TemperatureUnit) {
        if *self == target {
            return;
        }
        for v in values.iter_mut() {
            *v = self.convert(*v, target);
        }
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
