//! Identity map and per-operation session
//!
//! The identity map keeps one live instance per (type, id) for the duration
//! of a single top-level operation. Registering an instance before resolving
//! its references is what keeps cyclic graphs finite.

use crate::entity::{EntityId, EntityType, Link};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};

/// Operation-scoped cache from (entity type, identifier) to live instance
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: HashMap<TypeId, HashMap<EntityId, Link>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance under its own type
    pub fn register(&mut self, id: EntityId, entity: Link) {
        let ty = entity.entity_type();
        self.register_as(ty, id, entity);
    }

    /// Register an instance under an explicit type
    pub fn register_as(&mut self, ty: EntityType, id: EntityId, entity: Link) {
        self.entries.entry(ty.type_id()).or_default().insert(id, entity);
    }

    pub fn get(&self, ty: EntityType, id: EntityId) -> Option<Link> {
        self.entries
            .get(&ty.type_id())
            .and_then(|by_id| by_id.get(&id))
            .cloned()
    }

    pub fn contains(&self, ty: EntityType, id: EntityId) -> bool {
        self.entries
            .get(&ty.type_id())
            .is_some_and(|by_id| by_id.contains_key(&id))
    }

    /// Evict one entry
    pub fn remove(&mut self, ty: EntityType, id: EntityId) -> Option<Link> {
        let by_id = self.entries.get_mut(&ty.type_id())?;
        let removed = by_id.remove(&id);
        if by_id.is_empty() {
            self.entries.remove(&ty.type_id());
        }
        removed
    }

    /// Evict everything
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State shared by every nested call of one top-level operation.
///
/// Dropping the session evicts everything it registered, whether the
/// operation succeeded or not.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub(crate) identity: IdentityMap,
    deleting: HashSet<(TypeId, EntityId)>,
}

impl Session {
    pub(crate) fn new() -> Self {
        tracing::trace!("session opened");
        Self::default()
    }

    /// Mark (type, id) as being deleted; false if it already was
    pub(crate) fn begin_delete(&mut self, ty: EntityType, id: EntityId) -> bool {
        self.deleting.insert((ty.type_id(), id))
    }

    pub(crate) fn flush(&mut self) {
        self.identity.flush();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::trace!("session closed, evicting {} instance(s)", self.identity.len());
        self.identity.flush();
        self.deleting.clear();
    }
}
