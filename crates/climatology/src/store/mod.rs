//! Persistence of derived products.

mod zarr_store;

pub use zarr_store::{ArtifactAttributes, ZarrProductStore};

use climate_common::{ClimateError, Result};

use crate::types::{Artifact, DerivedProduct};

/// A durable container of named derived products.
pub trait ProductStore: Send + Sync {
    /// Remove every prior artifact, then persist `products`.
    fn write(&self, products: &[DerivedProduct]) -> Result<()>;

    /// Reload a previously written artifact.
    ///
    /// Fails with `NotFound` when the artifact was never written.
    fn read(&self, artifact: Artifact) -> Result<DerivedProduct>;

    /// Remove every artifact, returning how many were removed.
    fn clear(&self) -> Result<usize>;

    /// Whether the artifact is currently present.
    fn exists(&self, artifact: Artifact) -> bool;

    /// Reload an artifact by its store name.
    fn read_named(&self, name: &str) -> Result<DerivedProduct> {
        let artifact = Artifact::from_name(name).ok_or_else(|| {
            ClimateError::not_found(format!(
                "unknown artifact '{}' (expected one of: {})",
                name,
                Artifact::ALL.map(|a| a.name()).join(", ")
            ))
        })?;
        self.read(artifact)
    }
}
