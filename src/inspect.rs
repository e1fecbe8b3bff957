//! Schema-less inspection of an on-disk store
//!
//! Works from the directory layout alone, without any entity types: every
//! subdirectory is a collection, every regular file without an extension is
//! a relation store.

use crate::collection::{document_ids, Document};
use crate::entity::EntityId;
use crate::relation::{RelationRecord, RelationStore};
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub name: String,
    pub documents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub name: String,
    pub records: usize,
}

/// A relation record pointing at an identifier found in neither collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRecord {
    pub store: String,
    pub record: RelationRecord,
    pub missing: EntityId,
}

/// Collections and relation stores found under a base directory
#[derive(Debug, Clone)]
pub struct Layout {
    base_dir: PathBuf,
    pub collections: Vec<CollectionSummary>,
    pub relation_stores: Vec<StoreSummary>,
}

impl Layout {
    pub fn scan(base_dir: &Path) -> Result<Self> {
        let mut collections = Vec::new();
        let mut relation_stores = Vec::new();

        let entries = fs::read_dir(base_dir).map_err(|e| Error::read(base_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::read(base_dir, e))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            if path.is_dir() {
                collections.push(CollectionSummary {
                    documents: document_ids(&path)?.len(),
                    name,
                });
            } else if path.is_file() && !name.contains('.') {
                relation_stores.push(StoreSummary {
                    records: RelationStore::at(&path).records()?.len(),
                    name,
                });
            }
        }

        collections.sort_by(|a, b| a.name.cmp(&b.name));
        relation_stores.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            collections,
            relation_stores,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.iter().any(|c| c.name == name)
    }

    pub fn has_relation_store(&self, name: &str) -> bool {
        self.relation_stores.iter().any(|s| s.name == name)
    }

    pub fn ids(&self, collection: &str) -> Result<Vec<EntityId>> {
        document_ids(&self.base_dir.join(collection))
    }

    /// Raw document as stored, without schema checks
    pub fn document(&self, collection: &str, id: EntityId) -> Result<Option<Document>> {
        let path = self.base_dir.join(collection).join(format!("{}.json", id));
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|e| Error::read(&path, e))?;
        match serde_json::from_str(&contents) {
            Ok(Value::Object(document)) => Ok(Some(document)),
            Ok(_) => Err(Error::Deserialization(format!("{}: expected a JSON object", path.display()))),
            Err(e) => Err(Error::Deserialization(format!("{}: {}", path.display(), e))),
        }
    }

    pub fn relation_store(&self, name: &str) -> RelationStore {
        RelationStore::at(self.base_dir.join(name))
    }

    /// The two collections a store name joins, if both exist.
    /// Collection names never contain `_`, so the split is unambiguous.
    pub fn split_store_name(&self, store: &str) -> Option<(String, String)> {
        let (first, second) = store.split_once('_')?;
        (self.has_collection(first) && self.has_collection(second))
            .then(|| (first.to_string(), second.to_string()))
    }

    /// Records whose owner or related id has no document in either collection
    pub fn check(&self) -> Result<Vec<DanglingRecord>> {
        let mut dangling = Vec::new();

        for summary in &self.relation_stores {
            let Some((first, second)) = self.split_store_name(&summary.name) else {
                tracing::warn!("Relation store {} matches no pair of collections, skipping", summary.name);
                continue;
            };

            let stored = |id: EntityId| {
                let file = format!("{}.json", id);
                self.base_dir.join(&first).join(&file).exists()
                    || self.base_dir.join(&second).join(&file).exists()
            };

            for record in self.relation_store(&summary.name).records()? {
                let missing = [record.owner, record.related].into_iter().find(|id| !stored(*id));
                if let Some(missing) = missing {
                    dangling.push(DanglingRecord {
                        store: summary.name.clone(),
                        record,
                        missing,
                    });
                }
            }
        }

        Ok(dangling)
    }

    /// Delete the given records; returns how many were removed
    pub fn repair(&self, dangling: &[DanglingRecord]) -> Result<usize> {
        let mut removed = 0;
        for entry in dangling {
            let store = self.relation_store(&entry.store);
            if store.delete_relation(entry.record.owner, entry.record.related)? {
                removed += 1;
            }
        }
        tracing::info!("Removed {} dangling relation record(s)", removed);
        Ok(removed)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Store at {}:", self.base_dir.display())?;
        writeln!(f, "  Collections: {}", self.collections.len())?;
        for collection in &self.collections {
            writeln!(f, "    {}: {} document(s)", collection.name, collection.documents)?;
        }
        writeln!(f, "  Relation stores: {}", self.relation_stores.len())?;
        for store in &self.relation_stores {
            writeln!(f, "    {}: {} record(s)", store.name, store.records)?;
        }
        Ok(())
    }
}
