//! Collection registry - one lazily created store per entity type

use crate::collection::CollectionStore;
use crate::entity::EntityType;
use crate::schema::is_valid_collection_name;
use crate::{Error, Result};
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Creates and caches a [`CollectionStore`] per entity type
#[derive(Debug)]
pub struct CollectionRegistry {
    base_dir: PathBuf,
    pretty: bool,
    stores: RefCell<HashMap<TypeId, Rc<CollectionStore>>>,
}

impl CollectionRegistry {
    pub fn new(base_dir: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            base_dir: base_dir.into(),
            pretty,
            stores: RefCell::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Store for `ty`, validating the type and creating its directory on first use
    pub fn get_collection(&self, ty: EntityType) -> Result<Rc<CollectionStore>> {
        if let Some(store) = self.stores.borrow().get(&ty.type_id()) {
            return Ok(Rc::clone(store));
        }

        let name = ty.collection();
        if !is_valid_collection_name(name) {
            return Err(Error::SchemaDeclaration(format!(
                "type {} is not persistable: invalid collection name {:?}",
                ty.name(),
                name
            )));
        }

        if let Some(other) = self
            .stores
            .borrow()
            .values()
            .find(|store| store.name().eq_ignore_ascii_case(name))
        {
            return Err(Error::SchemaDeclaration(format!(
                "collection {} is already bound to {}, cannot bind it to {}",
                name,
                other.entity_type().name(),
                ty.name()
            )));
        }

        let schema = ty.schema();
        schema.validate(ty)?;

        let dir = self.base_dir.join(name);
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| Error::write(&dir, e))?;
            tracing::info!("Created collection {} at {}", name, dir.display());
        }

        let store = Rc::new(CollectionStore::new(ty, schema, dir, self.pretty));
        self.stores
            .borrow_mut()
            .insert(ty.type_id(), Rc::clone(&store));
        Ok(store)
    }

    pub fn is_registered(&self, ty: EntityType) -> bool {
        self.stores.borrow().contains_key(&ty.type_id())
    }

    /// Stores created so far, ordered by collection name
    pub fn registered(&self) -> Vec<Rc<CollectionStore>> {
        let mut stores: Vec<_> = self.stores.borrow().values().cloned().collect();
        stores.sort_by(|a, b| a.name().cmp(b.name()));
        stores
    }
}
