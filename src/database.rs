//! Database facade - base directory, registry and typed collections

use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::entity::{Entity, EntityType};
use crate::registry::CollectionRegistry;
use crate::relation::RelationStore;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// An on-disk store rooted at one base directory.
///
/// Holds `Rc` state and is therefore neither `Send` nor `Sync`; one
/// database value has exactly one writer.
#[derive(Debug)]
pub struct Database {
    registry: CollectionRegistry,
}

impl Database {
    /// Open (creating if needed) a store with pretty-printed documents
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(base_dir, true)
    }

    pub fn with_options(base_dir: impl AsRef<Path>, pretty: bool) -> Result<Self> {
        let base_dir: PathBuf = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| Error::write(&base_dir, e))?;

        tracing::debug!("Opened database at {}", base_dir.display());
        Ok(Self {
            registry: CollectionRegistry::new(base_dir, pretty),
        })
    }

    /// Open the store a configuration file points at
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::with_options(&config.database.path, config.database.pretty)
    }

    pub fn base_dir(&self) -> &Path {
        self.registry.base_dir()
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// Register `T` up front, surfacing schema errors before first use
    pub fn register<T: Entity>(&self) -> Result<()> {
        self.registry.get_collection(EntityType::of::<T>()).map(|_| ())
    }

    pub fn collection<T: Entity>(&self) -> Result<Collection<'_, T>> {
        let store = self.registry.get_collection(EntityType::of::<T>())?;
        Ok(Collection::new(self, store))
    }

    /// Relation store linking two collections, in either order
    pub fn relation_store(&self, a: &str, b: &str) -> RelationStore {
        RelationStore::open(self.base_dir(), a, b)
    }
}
