//! Collection stores - one JSON document per entity instance
//!
//! Documents live at `<base>/<collection>/<id>.json`. [`CollectionStore`]
//! handles the raw document I/O; [`Collection`] is the typed front end that
//! runs the resolution protocol for every call.

use crate::database::Database;
use crate::entity::{Entity, EntityId, EntityType, Link, Shared};
use crate::graph::Graph;
use crate::identity::Session;
use crate::resolve::Resolver;
use crate::schema::Schema;
use crate::{Error, Result};
use serde_json::Value;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Persisted form of one entity, keys in schema order
pub type Document = serde_json::Map<String, Value>;

/// How long [`Collection::find_all`] keeps loaded instances registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Each document resolves its references independently
    #[default]
    PerRecord,
    /// One identity map for the whole listing; siblings share instances
    Deferred,
}

/// Identifiers of the `<id>.json` documents in `dir`, sorted.
/// A missing directory holds no documents.
pub(crate) fn document_ids(dir: &Path) -> Result<Vec<EntityId>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| Error::read(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| Error::read(dir, e))?;
        let path = entry.path();

        if let Some(filename) = path.file_name().and_then(|s| s.to_str())
            && let Some(stem) = filename.strip_suffix(".json")
            && let Ok(id) = EntityId::parse_str(stem)
        {
            ids.push(id);
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

/// Document storage for one entity type
#[derive(Debug)]
pub struct CollectionStore {
    entity_type: EntityType,
    schema: Schema,
    dir: PathBuf,
    pretty: bool,
}

impl CollectionStore {
    pub(crate) fn new(entity_type: EntityType, schema: Schema, dir: PathBuf, pretty: bool) -> Self {
        Self {
            entity_type,
            schema,
            dir,
            pretty,
        }
    }

    pub fn name(&self) -> &'static str {
        self.entity_type.collection()
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn document_path(&self, id: EntityId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Filesystem check only; the document is not parsed
    pub fn exists_by_id(&self, id: EntityId) -> bool {
        self.document_path(id).exists()
    }

    /// Identifiers of every stored document, sorted
    pub fn ids(&self) -> Result<Vec<EntityId>> {
        document_ids(&self.dir)
    }

    /// Raw document, or `None` when absent
    pub fn read_document(&self, id: EntityId) -> Result<Option<Document>> {
        let path = self.document_path(id);

        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|e| Error::read(&path, e))?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| {
            Error::Deserialization(format!("{}: {}", path.display(), e))
        })?;

        let Value::Object(document) = value else {
            return Err(Error::Deserialization(format!(
                "{}: expected a JSON object",
                path.display()
            )));
        };

        tracing::debug!("Loaded {}[{}] from {}", self.name(), id, path.display());
        Ok(Some(document))
    }

    /// Create or overwrite a document through a temp file and rename
    pub fn write_document(&self, id: EntityId, document: &Document) -> Result<()> {
        let path = self.document_path(id);
        let temp_path = path.with_extension("json.tmp");

        let contents = if self.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };

        fs::write(&temp_path, contents).map_err(|e| Error::write(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::write(&path, e)
        })?;

        tracing::debug!("Saved {}[{}] to {}", self.name(), id, path.display());
        Ok(())
    }

    /// Remove a document; false when it was not there
    pub fn remove_document(&self, id: EntityId) -> Result<bool> {
        let path = self.document_path(id);

        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path).map_err(|e| Error::write(&path, e))?;
        tracing::debug!("Deleted {}[{}]", self.name(), id);
        Ok(true)
    }
}

/// Typed access to the collection of `T`
pub struct Collection<'db, T: Entity> {
    db: &'db Database,
    store: Rc<CollectionStore>,
    _entity: PhantomData<T>,
}

impl<'db, T: Entity> Collection<'db, T> {
    pub(crate) fn new(db: &'db Database, store: Rc<CollectionStore>) -> Self {
        Self {
            db,
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    /// Persist `entity` and, per cascade policy, the graph it reaches
    pub fn save(&self, entity: &Shared<T>) -> Result<EntityId> {
        let mut session = Session::new();
        Resolver::new(self.db, &mut session).save(&Link::new(entity))
    }

    pub fn find_by_id(&self, id: EntityId) -> Result<Option<Shared<T>>> {
        let mut session = Session::new();
        Resolver::new(self.db, &mut session)
            .load(self.store.entity_type(), id)?
            .map(|link| link.downcast::<T>())
            .transpose()
    }

    /// Like [`Collection::find_by_id`], but the loaded graph is detached
    /// when the returned handle is dropped
    pub fn find_graph(&self, id: EntityId) -> Result<Option<Graph<T>>> {
        Ok(self.find_by_id(id)?.map(Graph::new))
    }

    /// Every stored entity, in identifier order
    pub fn find_all(&self, flush: FlushMode) -> Result<Vec<Shared<T>>> {
        let mut session = Session::new();
        let mut found = Vec::new();

        for id in self.store.ids()? {
            let loaded = Resolver::new(self.db, &mut session).load(self.store.entity_type(), id)?;
            if let Some(link) = loaded {
                found.push(link.downcast::<T>()?);
            }
            if flush == FlushMode::PerRecord {
                session.flush();
            }
        }

        Ok(found)
    }

    pub fn exists_by_id(&self, id: EntityId) -> bool {
        self.store.exists_by_id(id)
    }

    /// Delete the document, cascaded children and every relation record
    /// mentioning `id`. Storage failures are logged and reported as `false`.
    pub fn delete_by_id(&self, id: EntityId) -> Result<bool> {
        let mut session = Session::new();
        match Resolver::new(self.db, &mut session).delete(self.store.entity_type(), id) {
            Ok(deleted) => Ok(deleted),
            Err(e) if e.is_storage() => {
                tracing::warn!("Could not delete {}[{}]: {}", self.store.name(), id, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn ids(&self) -> Result<Vec<EntityId>> {
        self.store.ids()
    }
}
