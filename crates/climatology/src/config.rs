//! Configuration for climatology runs.

use std::fmt;
use std::path::{Path, PathBuf};

use climate_common::{ClimateError, Result, TemperatureUnit, DEFAULT_TIME_CHUNK};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Closed interval of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Whether `year` lies inside the interval.
    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    /// Parse `"start-end"`, e.g. `"1948-1957"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (start, end) = s.trim().split_once('-')?;
        Some(Self {
            start: start.trim().parse().ok()?,
            end: end.trim().parse().ok()?,
        })
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(1948, 1957)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Configuration for a climatology run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    /// Input locations: files, directories, patterns or URLs.
    pub data: Vec<String>,

    /// Name of the temperature variable in the input files.
    pub variable: String,

    /// Directory holding the persisted artifacts.
    pub output_dir: PathBuf,

    /// Unit used for statistics and every derived product.
    pub units: TemperatureUnit,

    /// Years a baseline period may be drawn from.
    pub baseline_domain: YearRange,

    /// Time steps read per slab.
    pub time_chunk: usize,

    /// Chunk dimension for lat/lon in Zarr artifacts.
    pub zarr_chunk_size: usize,

    /// Compression codec for Zarr artifacts.
    pub zarr_compression: ZarrCompression,

    /// Compression level (1-9).
    pub zarr_compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub zarr_shuffle: bool,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            data: vec!["input_data/air.2m.gauss.*.nc".to_string()],
            variable: "air".to_string(),
            output_dir: PathBuf::from("output"),
            units: TemperatureUnit::Kelvin,
            baseline_domain: YearRange::default(),
            time_chunk: DEFAULT_TIME_CHUNK,
            zarr_chunk_size: 30,
            zarr_compression: ZarrCompression::BloscZstd,
            zarr_compression_level: 1,
            zarr_shuffle: true,
        }
    }
}

impl ClimateConfig {
    /// Load defaults, then an optional YAML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        Ok(config.with_env())
    }

    /// Read a YAML file; missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClimateError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            ClimateError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Override fields from environment variables that are set and parse.
    pub fn with_env(mut self) -> Self {
        if let Ok(val) = std::env::var("CLIMATE_DATA") {
            let data: Vec<String> = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !data.is_empty() {
                self.data = data;
            }
        }

        if let Ok(val) = std::env::var("CLIMATE_VARIABLE") {
            self.variable = val;
        }

        if let Ok(val) = std::env::var("CLIMATE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CLIMATE_UNITS") {
            if let Some(units) = TemperatureUnit::parse(&val) {
                self.units = units;
            }
        }

        if let Ok(val) = std::env::var("CLIMATE_BASELINE_DOMAIN") {
            if let Some(domain) = YearRange::parse(&val) {
                self.baseline_domain = domain;
            }
        }

        if let Ok(val) = std::env::var("CLIMATE_TIME_CHUNK") {
            if let Ok(size) = val.parse() {
                self.time_chunk = size;
            }
        }

        if let Ok(val) = std::env::var("ZARR_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                self.zarr_chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION") {
            self.zarr_compression = ZarrCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                self.zarr_compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ZARR_SHUFFLE") {
            self.zarr_shuffle = val.to_lowercase() == "true" || val == "1";
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.time_chunk == 0 {
            return Err("time_chunk must be > 0".to_string());
        }

        if self.zarr_chunk_size == 0 {
            return Err("zarr_chunk_size must be > 0".to_string());
        }

        if self.zarr_compression_level == 0 || self.zarr_compression_level > 9 {
            return Err("zarr_compression_level must be 1-9".to_string());
        }

        if self.baseline_domain.start > self.baseline_domain.end {
            return Err(format!(
                "baseline_domain {} has start after end",
                self.baseline_domain
            ));
        }

        if self.variable.trim().is_empty() {
            return Err("variable must not be empty".to_string());
        }

        Ok(())
    }
}

/// Compression codec for Zarr files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZarrCompression {
    /// No compression.
    None,
    /// LZ4 compression.
    Lz4,
    /// Zstd compression.
    Zstd,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd (recommended).
    #[default]
    BloscZstd,
}

impl ZarrCompression {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" => Self::Lz4,
            "zstd" => Self::Zstd,
            "blosc_lz4" => Self::BloscLz4,
            "blosc_zstd" => Self::BloscZstd,
            _ => Self::BloscZstd,
        }
    }

    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClimateConfig::default();
        assert_eq!(config.variable, "air");
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.units, TemperatureUnit::Kelvin);
        assert_eq!(config.baseline_domain, YearRange::new(1948, 1957));
        assert_eq!(config.time_chunk, 200);
        assert_eq!(config.zarr_chunk_size, 30);
        assert_eq!(config.zarr_compression, ZarrCompression::BloscZstd);
        assert_eq!(config.zarr_compression_level, 1);
        assert!(config.zarr_shuffle);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClimateConfig::default();
        assert!(config.validate().is_ok());

        config.zarr_chunk_size = 0;
        assert!(config.validate().is_err());

        config = ClimateConfig::default();
        config.time_chunk = 0;
        assert!(config.validate().is_err());

        config = ClimateConfig::default();
        config.zarr_compression_level = 0;
        assert!(config.validate().is_err());

        config.zarr_compression_level = 10;
        assert!(config.validate().is_err());

        config = ClimateConfig::default();
        config.baseline_domain = YearRange::new(1957, 1948);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_year_range_parse() {
        assert_eq!(YearRange::parse("1948-1957"), Some(YearRange::new(1948, 1957)));
        assert_eq!(YearRange::parse(" 1950 - 1960 "), Some(YearRange::new(1950, 1960)));
        assert_eq!(YearRange::parse("1948"), None);
        assert_eq!(YearRange::new(1948, 1957).to_string(), "1948-1957");
        assert!(YearRange::new(1948, 1957).contains(1957));
        assert!(!YearRange::new(1948, 1957).contains(1958));
    }

    #[test]
    fn test_yaml_partial_keeps_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("climate.yaml");
        std::fs::write(
            &path,
            "variable: tas\nunits: celsius\nbaseline_domain:\n  start: 1950\n  end: 1960\nzarr_compression: lz4\n",
        )
        .unwrap();

        let config = ClimateConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.variable, "tas");
        assert_eq!(config.units, TemperatureUnit::Celsius);
        assert_eq!(config.baseline_domain, YearRange::new(1950, 1960));
        assert_eq!(config.zarr_compression, ZarrCompression::Lz4);
        assert_eq!(config.zarr_chunk_size, 30);
    }

    #[test]
    fn test_yaml_missing_file_is_config_error() {
        let err = ClimateConfig::from_yaml_file(Path::new("/nonexistent/climate.yaml")).unwrap_err();
        assert_eq!(err.code(), "ConfigError");
    }

    #[test]
    fn test_zarr_compression_from_str() {
        assert_eq!(ZarrCompression::from_str("none"), ZarrCompression::None);
        assert_eq!(ZarrCompression::from_str("BLOSC_LZ4"), ZarrCompression::BloscLz4);
        assert_eq!(ZarrCompression::from_str("invalid"), ZarrCompression::BloscZstd);
    }
}
