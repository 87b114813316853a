//! Zarr V3 artifact store on the local filesystem.
//!
//! Each artifact is one Float32 array of shape `[year, lat, lon]` stored at
//! `<root>/<artifact>.zarr/`. Coordinate labels, units and provenance live
//! in the array attributes so an artifact can be read back on its own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use climate_common::{ClimateError, Result, TemperatureUnit};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use super::ProductStore;
use crate::config::{ClimateConfig, YearRange, ZarrCompression};
use crate::types::{Artifact, DerivedProduct};

const ARTIFACT_SUFFIX: &str = "zarr";
const DIMENSIONS: [&str; 3] = ["year", "lat", "lon"];

/// Attributes written alongside every artifact array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactAttributes {
    pub artifact: Artifact,
    pub variable: String,
    pub dimensions: Vec<String>,
    pub units: String,
    pub year: Vec<i32>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_period: Option<YearRange>,
    pub created_at: DateTime<Utc>,
}

impl ArtifactAttributes {
    fn from_product(product: &DerivedProduct) -> Self {
        Self {
            artifact: product.artifact,
            variable: product.variable.clone(),
            dimensions: DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            units: product.units.as_str().to_string(),
            year: product.years.clone(),
            lat: product.lats.clone(),
            lon: product.lons.clone(),
            baseline_period: product.baseline_period,
            created_at: Utc::now(),
        }
    }

    fn to_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(ClimateError::storage("artifact attributes are not an object")),
        }
    }
}

/// Settings controlling how artifacts are chunked and compressed.
#[derive(Debug, Clone)]
struct WriteSettings {
    chunk_size: usize,
    compression: ZarrCompression,
    compression_level: u8,
    shuffle: bool,
}

/// Filesystem-backed [`ProductStore`] writing Zarr V3 arrays.
#[derive(Debug, Clone)]
pub struct ZarrProductStore {
    root: PathBuf,
    settings: WriteSettings,
}

impl ZarrProductStore {
    /// Store rooted at `config.output_dir`.
    pub fn new(config: &ClimateConfig) -> Self {
        Self::at(&config.output_dir, config)
    }

    /// Store rooted at `root`, using the chunking and codec settings of
    /// `config`.
    pub fn at(root: &Path, config: &ClimateConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            settings: WriteSettings {
                chunk_size: config.zarr_chunk_size.max(1),
                compression: config.zarr_compression,
                compression_level: config.zarr_compression_level,
                shuffle: config.zarr_shuffle,
            },
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of an artifact.
    pub fn artifact_path(&self, artifact: Artifact) -> PathBuf {
        self.root
            .join(format!("{}.{}", artifact.name(), ARTIFACT_SUFFIX))
    }

    fn write_product(&self, product: &DerivedProduct) -> Result<()> {
        let path = self.artifact_path(product.artifact);
        std::fs::create_dir_all(&path)?;
        let store = FilesystemStore::new(&path)
            .map_err(|e| ClimateError::storage(format!("{}: {}", path.display(), e)))?;

        let (n_years, ny, nx) = product.shape();
        let chunk = self.settings.chunk_size as u64;
        let chunk_grid: zarrs::array::ChunkGrid = vec![1, chunk, chunk]
            .try_into()
            .map_err(|e| ClimateError::Config(format!("invalid chunk grid: {:?}", e)))?;

        let attrs = ArtifactAttributes::from_product(product).to_map()?;

        let mut binding = ArrayBuilder::new(
            vec![n_years as u64, ny as u64, nx as u64],
            DataType::Float32,
            chunk_grid,
            FillValue::from(f32::NAN),
        );
        let mut builder = binding.attributes(attrs);

        if self.settings.compression != ZarrCompression::None {
            let codec = self.create_compression_codec()?;
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        let array = builder
            .build(Arc::new(store), "/")
            .map_err(|e| ClimateError::storage(e.to_string()))?;

        array
            .store_metadata()
            .map_err(|e| ClimateError::storage(e.to_string()))?;

        let subset = ArraySubset::new_with_start_shape(
            vec![0, 0, 0],
            vec![n_years as u64, ny as u64, nx as u64],
        )
        .map_err(|e| ClimateError::storage(e.to_string()))?;

        array
            .store_array_subset_elements(&subset, &product.values)
            .map_err(|e| ClimateError::storage(e.to_string()))?;

        info!(
            artifact = product.artifact.name(),
            variable = %product.variable,
            years = n_years,
            cells = ny * nx,
            path = %path.display(),
            "Wrote artifact"
        );
        Ok(())
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(
        &self,
    ) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.settings.compression_level)
            .map_err(|_| ClimateError::Config("Invalid compression level".to_string()))?;

        let shuffle = if self.settings.shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = if self.settings.shuffle { Some(4) } else { None };

        let compressor = match self.settings.compression {
            ZarrCompression::None => {
                return Err(ClimateError::Config(
                    "No compression configured".to_string(),
                ))
            }
            ZarrCompression::Lz4 | ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::Zstd | ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| ClimateError::Config(e.to_string()))?;

        Ok(Arc::new(codec))
    }
}

impl ProductStore for ZarrProductStore {
    fn write(&self, products: &[DerivedProduct]) -> Result<()> {
        let removed = self.clear()?;
        debug!(removed = removed, root = %self.root.display(), "Cleared prior artifacts");
        std::fs::create_dir_all(&self.root)?;
        for product in products {
            self.write_product(product)?;
        }
        Ok(())
    }

    fn read(&self, artifact: Artifact) -> Result<DerivedProduct> {
        let path = self.artifact_path(artifact);
        if !self.exists(artifact) {
            return Err(ClimateError::not_found(format!(
                "artifact '{}' not found at {}; run `climate baseline` or `climate anomaly` first",
                artifact.name(),
                path.display()
            )));
        }

        let store = FilesystemStore::new(&path)
            .map_err(|e| ClimateError::storage(format!("{}: {}", path.display(), e)))?;
        let array = Array::open(Arc::new(store), "/")
            .map_err(|e| ClimateError::storage(format!("{}: {}", path.display(), e)))?;

        let attrs: ArtifactAttributes =
            serde_json::from_value(serde_json::Value::Object(array.attributes().clone()))
                .map_err(|e| {
                    ClimateError::schema(format!(
                        "artifact at {} has invalid attributes: {}",
                        path.display(),
                        e
                    ))
                })?;

        if attrs.artifact != artifact {
            return Err(ClimateError::schema(format!(
                "{} holds artifact '{}', expected '{}'",
                path.display(),
                attrs.artifact,
                artifact
            )));
        }

        let expected = [attrs.year.len() as u64, attrs.lat.len() as u64, attrs.lon.len() as u64];
        if array.shape() != expected.as_slice() {
            return Err(ClimateError::schema(format!(
                "{} has shape {:?} but its coordinates describe {:?}",
                path.display(),
                array.shape(),
                expected
            )));
        }

        let units = TemperatureUnit::parse(&attrs.units).ok_or_else(|| {
            ClimateError::schema(format!(
                "{} has unrecognised units '{}'",
                path.display(),
                attrs.units
            ))
        })?;

        let subset = ArraySubset::new_with_start_shape(vec![0, 0, 0], expected.to_vec())
            .map_err(|e| ClimateError::storage(e.to_string()))?;
        let values: Vec<f32> = array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| ClimateError::storage(e.to_string()))?;

        debug!(artifact = artifact.name(), path = %path.display(), "Read artifact");

        let mut product = DerivedProduct::new(
            artifact,
            units,
            attrs.year,
            attrs.lat,
            attrs.lon,
            values,
            attrs.baseline_period,
        )?;
        product.variable = attrs.variable;
        Ok(product)
    }

    fn clear(&self) -> Result<usize> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let is_artifact = path.is_dir()
                && path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_SUFFIX);
            if is_artifact {
                std::fs::remove_dir_all(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn exists(&self, artifact: Artifact) -> bool {
        self.artifact_path(artifact).join("zarr.json").is_file()
    }
}
