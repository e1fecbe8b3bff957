//! # docgraph - embedded document store for entity graphs
//!
//! Stores arbitrary entity graphs on a filesystem as one JSON document per
//! entity, with declared relationships kept out of band.
//!
//! docgraph provides:
//! - Explicit entity schemas (identifier, scalar fields, relationships)
//! - Per-collection document storage under a base directory
//! - Flat-file relation stores for one-to-many and many-to-many links
//! - Cascading save/delete with referential integrity checks
//! - A per-operation identity map that keeps cyclic graphs finite

pub mod entity;
pub mod schema;
pub mod identity;
pub mod relation;
pub mod registry;
pub mod collection;
pub mod resolve;
pub mod graph;
pub mod database;
pub mod config;
pub mod inspect;
pub mod ui;

#[cfg(test)]
pub(crate) mod fixtures;

use std::path::PathBuf;

// Re-exports for convenient access
pub use entity::{shared, Entity, EntityId, EntityType, FieldValue, Link, Shared};
pub use schema::{Cascade, Fetch, FieldDescriptor, FieldKind, Multiplicity, Ownership, Relationship, Schema};
pub use identity::IdentityMap;
pub use relation::{RelationRecord, RelationStore, Side};
pub use registry::CollectionRegistry;
pub use collection::{Collection, CollectionStore, Document, FlushMode};
pub use graph::{detach, Graph};
pub use database::Database;
pub use config::StoreConfig;

/// Result type alias for docgraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for docgraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema declaration error: {0}")]
    SchemaDeclaration(String),

    #[error("Missing identifier: {0}")]
    MissingIdentifier(String),

    #[error("Reference integrity violation: referenced entity of type {type_name} with id {id} does not exist")]
    ReferenceIntegrity { type_name: String, id: EntityId },

    #[error("Could not write {}: {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Entity of type {0} is already mutably borrowed")]
    EntityBorrowed(String),
}

impl Error {
    /// Error for a field name the entity does not declare
    pub fn unknown_field<T: Entity>(field: &str) -> Self {
        Error::SchemaDeclaration(format!(
            "field {} is not declared on {}",
            field,
            EntityType::of::<T>().name()
        ))
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StorageWrite { path: path.into(), source }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StorageRead { path: path.into(), source }
    }

    /// True for filesystem failures (as opposed to schema or integrity errors)
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::StorageWrite { .. } | Error::StorageRead { .. })
    }
}
