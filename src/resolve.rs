//! Reference resolution - turning entity graphs into flat documents and back
//!
//! Writing walks an entity's schema and produces one shallow document:
//! scalars verbatim, owning to-one references as identifiers, everything
//! else as `null` / `[]`. To-many links go to the relation store, and
//! related entities are saved or checked for existence per cascade policy.
//!
//! Reading reverses this. Every instance is registered in the session's
//! identity map before its fields are resolved, so a reference back to an
//! instance that is still loading yields that same instance.

use crate::collection::{CollectionStore, Document};
use crate::database::Database;
use crate::entity::{EntityId, EntityType, FieldValue, Link};
use crate::identity::Session;
use crate::relation::Side;
use crate::schema::{Fetch, FieldKind, Multiplicity, Ownership, Relationship, Schema};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Runs the write, read and delete protocols within one session
pub(crate) struct Resolver<'a> {
    db: &'a Database,
    session: &'a mut Session,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(db: &'a Database, session: &'a mut Session) -> Self {
        Self { db, session }
    }

    fn collection(&self, ty: EntityType) -> Result<Rc<CollectionStore>> {
        self.db.registry().get_collection(ty)
    }

    // ========== Write protocol ==========

    /// Save `entity` unless this session already saved it
    pub(crate) fn save(&mut self, entity: &Link) -> Result<EntityId> {
        let ty = entity.entity_type();
        let store = self.collection(ty)?;
        let schema = store.schema();
        let id = schema.identifier(entity)?;

        if self.session.identity.contains(ty, id) {
            return Ok(id);
        }
        self.session.identity.register(id, entity.clone());

        let mut document = Document::new();
        document.insert(
            schema.require_id_field(ty.name())?.to_string(),
            Value::String(id.to_string()),
        );

        for field in schema.fields() {
            let value = entity.get_field(field.name)?;
            let emitted = match field.kind {
                FieldKind::Scalar => match value {
                    FieldValue::Scalar(value) => value,
                    other => {
                        return Err(Error::SchemaDeclaration(format!(
                            "{}.{} is declared as a scalar but holds {}",
                            ty.name(),
                            field.name,
                            other.kind_name()
                        )));
                    }
                },
                FieldKind::Relation(relationship) => {
                    self.write_relation(entity, id, field.name, &relationship, value)?
                }
            };
            document.insert(field.name.to_string(), emitted);
        }

        store.write_document(id, &document)?;
        Ok(id)
    }

    fn write_relation(
        &mut self,
        owner: &Link,
        owner_id: EntityId,
        field: &str,
        relationship: &Relationship,
        value: FieldValue,
    ) -> Result<Value> {
        let owner_ty = owner.entity_type();

        match *relationship {
            Relationship::ToOne { ownership: Ownership::Owning, .. } => {
                let Some(related) = single_link(owner_ty, field, value)? else {
                    return Ok(Value::Null);
                };
                let related_id = self.ensure_persisted(owner_ty, field, relationship, &related)?;
                Ok(Value::String(related_id.to_string()))
            }

            Relationship::ToOne { ownership: Ownership::Inverse(mapped_by), target, cascade, .. } => {
                let Some(related) = single_link(owner_ty, field, value)? else {
                    return Ok(Value::Null);
                };
                check_target(owner_ty, field, relationship, &related)?;
                related.set_field(mapped_by, FieldValue::One(Some(owner.clone())))?;

                let target_store = self.collection(target)?;
                let related_id = target_store.schema().identifier(&related)?;
                if !self.session.identity.contains(target, related_id) {
                    if cascade.save || target_store.exists_by_id(related_id) {
                        self.save(&related)?;
                    } else {
                        return Err(Error::ReferenceIntegrity {
                            type_name: target.name().to_string(),
                            id: related_id,
                        });
                    }
                }
                Ok(Value::Null)
            }

            Relationship::ToMany { target, multiplicity, ownership, .. } => {
                let related = many_links(owner_ty, field, value)?;
                let mut related_ids = Vec::with_capacity(related.len());
                for item in &related {
                    related_ids.push(self.ensure_persisted(owner_ty, field, relationship, item)?);
                }

                let store = self.db.relation_store(owner_ty.collection(), target.collection());
                match (multiplicity, ownership) {
                    (Multiplicity::OneToMany, Ownership::Owning) => {
                        for child_id in related_ids {
                            if !store.exists(owner_id, child_id)? {
                                store.clear_relation(child_id, Side::Related)?;
                                store.save_relation(owner_id, child_id)?;
                            }
                        }
                    }
                    (Multiplicity::ManyToMany, Ownership::Owning) => {
                        store.save_relations(owner_id, related_ids)?;
                    }
                    (Multiplicity::ManyToMany, Ownership::Inverse(_)) => {
                        store.save_relations_inverse(related_ids, owner_id)?;
                    }
                    (Multiplicity::OneToMany, Ownership::Inverse(_)) => {
                        return Err(Error::SchemaDeclaration(format!(
                            "{}.{} is a one-to-many and cannot be the inverse side",
                            owner_ty.name(),
                            field
                        )));
                    }
                }
                Ok(Value::Array(Vec::new()))
            }
        }
    }

    /// Make sure `related` is stored, saving it when cascade allows
    fn ensure_persisted(
        &mut self,
        owner_ty: EntityType,
        field: &str,
        relationship: &Relationship,
        related: &Link,
    ) -> Result<EntityId> {
        let target = check_target(owner_ty, field, relationship, related)?;
        let target_store = self.collection(target)?;
        let related_id = target_store.schema().identifier(related)?;

        if self.session.identity.contains(target, related_id) {
            return Ok(related_id);
        }

        if relationship.cascade_policy().save {
            self.save(related)?;
        } else if !target_store.exists_by_id(related_id) {
            return Err(Error::ReferenceIntegrity {
                type_name: target.name().to_string(),
                id: related_id,
            });
        }
        Ok(related_id)
    }

    // ========== Read protocol ==========

    /// Load one entity, reusing the instance this session already holds
    pub(crate) fn load(&mut self, ty: EntityType, id: EntityId) -> Result<Option<Link>> {
        if let Some(found) = self.session.identity.get(ty, id) {
            return Ok(Some(found));
        }

        let store = self.collection(ty)?;
        let Some(document) = store.read_document(id)? else {
            return Ok(None);
        };

        let schema = store.schema();
        check_document(ty, id, schema, &document)?;

        let entity = ty.instantiate().ok_or_else(|| {
            Error::Deserialization(format!("type {} provides no factory and cannot be loaded", ty.name()))
        })?;
        schema.assign_identifier(&entity, id)?;
        self.session.identity.register_as(ty, id, entity.clone());

        for field in schema.fields() {
            let value = match field.kind {
                FieldKind::Scalar => match document.get(field.name) {
                    Some(value) => FieldValue::Scalar(value.clone()),
                    None => continue,
                },
                FieldKind::Relation(relationship) => {
                    self.read_relation(ty, id, field.name, &relationship, &document)?
                }
            };
            entity.set_field(field.name, value)?;
        }

        Ok(Some(entity))
    }

    fn read_relation(
        &mut self,
        owner_ty: EntityType,
        owner_id: EntityId,
        field: &str,
        relationship: &Relationship,
        document: &Document,
    ) -> Result<FieldValue> {
        if relationship.is_to_many() && relationship.fetch_policy() == Fetch::Lazy {
            return Ok(FieldValue::Many(Vec::new()));
        }

        let target = relationship.target();
        match *relationship {
            Relationship::ToOne { ownership: Ownership::Owning, .. } => {
                let Some(related_id) = stored_reference(owner_ty, field, document)? else {
                    return Ok(FieldValue::One(None));
                };
                Ok(FieldValue::One(self.load_reference(owner_ty, field, target, related_id)?))
            }

            Relationship::ToOne { ownership: Ownership::Inverse(mapped_by), .. } => {
                let Some(related_id) = self.find_back_reference(target, mapped_by, owner_id)? else {
                    return Ok(FieldValue::One(None));
                };
                Ok(FieldValue::One(self.load_reference(owner_ty, field, target, related_id)?))
            }

            Relationship::ToMany { ownership, .. } => {
                let store = self.db.relation_store(owner_ty.collection(), target.collection());
                let mut links = Vec::new();
                for related_id in store.related_ids(owner_id, side_of(ownership))? {
                    if let Some(link) = self.load_reference(owner_ty, field, target, related_id)? {
                        links.push(link);
                    }
                }
                Ok(FieldValue::Many(links))
            }
        }
    }

    fn load_reference(
        &mut self,
        owner_ty: EntityType,
        field: &str,
        target: EntityType,
        id: EntityId,
    ) -> Result<Option<Link>> {
        let loaded = self.load(target, id)?;
        if loaded.is_none() {
            tracing::warn!(
                "{}.{} references missing {}[{}], leaving it empty",
                owner_ty.name(),
                field,
                target.collection(),
                id
            );
        }
        Ok(loaded)
    }

    /// First document in `target`'s collection whose `mapped_by` field holds `id`
    fn find_back_reference(
        &self,
        target: EntityType,
        mapped_by: &str,
        id: EntityId,
    ) -> Result<Option<EntityId>> {
        let store = self.collection(target)?;
        let wanted = id.to_string();

        for candidate in store.ids()? {
            if let Some(document) = store.read_document(candidate)?
                && document.get(mapped_by).and_then(Value::as_str) == Some(wanted.as_str())
            {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    // ========== Delete protocol ==========

    /// Delete one entity, its cascaded relations and its relation records.
    /// Each (type, id) is visited at most once per session.
    pub(crate) fn delete(&mut self, ty: EntityType, id: EntityId) -> Result<bool> {
        let store = self.collection(ty)?;
        if !self.session.begin_delete(ty, id) {
            return Ok(false);
        }

        let Some(document) = store.read_document(id)? else {
            return Ok(false);
        };

        let schema = store.schema();
        for (field, relationship) in schema.relations() {
            if !relationship.cascade_policy().delete {
                continue;
            }
            for related_id in self.related_ids(ty, id, field, &relationship, &document)? {
                self.delete(relationship.target(), related_id)?;
            }
        }

        self.clear_relations(ty, id, schema)?;
        store.remove_document(id)
    }

    /// Identifiers reachable through one relationship of a stored entity
    fn related_ids(
        &self,
        owner_ty: EntityType,
        owner_id: EntityId,
        field: &str,
        relationship: &Relationship,
        document: &Document,
    ) -> Result<Vec<EntityId>> {
        let target = relationship.target();
        match *relationship {
            Relationship::ToOne { ownership: Ownership::Owning, .. } => {
                Ok(stored_reference(owner_ty, field, document)?.into_iter().collect())
            }
            Relationship::ToOne { ownership: Ownership::Inverse(mapped_by), .. } => {
                Ok(self.find_back_reference(target, mapped_by, owner_id)?.into_iter().collect())
            }
            Relationship::ToMany { ownership, .. } => self
                .db
                .relation_store(owner_ty.collection(), target.collection())
                .related_ids(owner_id, side_of(ownership)),
        }
    }

    /// Drop every relation record mentioning `id`, on either side, in every
    /// store pairing this collection with a registered or related one
    fn clear_relations(&self, ty: EntityType, id: EntityId, schema: &Schema) -> Result<()> {
        let mut partners: BTreeSet<&'static str> = self
            .db
            .registry()
            .registered()
            .iter()
            .map(|store| store.name())
            .collect();
        partners.extend(
            schema
                .relations()
                .iter()
                .map(|(_, relationship)| relationship.target().collection()),
        );

        for partner in partners {
            let store = self.db.relation_store(ty.collection(), partner);
            store.clear_relation(id, Side::Owner)?;
            store.clear_relation(id, Side::Related)?;
        }
        Ok(())
    }
}

fn side_of(ownership: Ownership) -> Side {
    match ownership {
        Ownership::Owning => Side::Owner,
        Ownership::Inverse(_) => Side::Related,
    }
}

fn check_target(
    owner_ty: EntityType,
    field: &str,
    relationship: &Relationship,
    related: &Link,
) -> Result<EntityType> {
    let target = relationship.target();
    let found = related.entity_type();
    if found != target {
        return Err(Error::SchemaDeclaration(format!(
            "{}.{} is declared to reference {}, but holds a {}",
            owner_ty.name(),
            field,
            target.name(),
            found.name()
        )));
    }
    Ok(target)
}

fn single_link(owner_ty: EntityType, field: &str, value: FieldValue) -> Result<Option<Link>> {
    match value {
        FieldValue::One(link) => Ok(link),
        FieldValue::Scalar(Value::Null) => Ok(None),
        other => Err(Error::SchemaDeclaration(format!(
            "{}.{} is declared as a to-one reference but holds {}",
            owner_ty.name(),
            field,
            other.kind_name()
        ))),
    }
}

fn many_links(owner_ty: EntityType, field: &str, value: FieldValue) -> Result<Vec<Link>> {
    match value {
        FieldValue::Many(links) => Ok(links),
        other => Err(Error::SchemaDeclaration(format!(
            "{}.{} is declared as a to-many reference but holds {}",
            owner_ty.name(),
            field,
            other.kind_name()
        ))),
    }
}

fn stored_reference(owner_ty: EntityType, field: &str, document: &Document) -> Result<Option<EntityId>> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => EntityId::parse_str(raw).map(Some).map_err(|_| {
            Error::Deserialization(format!(
                "{}.{} holds an invalid identifier: {}",
                owner_ty.name(),
                field,
                raw
            ))
        }),
        Some(other) => Err(Error::Deserialization(format!(
            "{}.{} must hold an identifier, found {}",
            owner_ty.name(),
            field,
            other
        ))),
    }
}

/// Reject documents whose identifier or keys disagree with the schema
fn check_document(ty: EntityType, id: EntityId, schema: &Schema, document: &Document) -> Result<()> {
    let id_field = schema.require_id_field(ty.name())?;

    let stored = document
        .get(id_field)
        .and_then(Value::as_str)
        .and_then(|raw| EntityId::parse_str(raw).ok());
    if stored != Some(id) {
        return Err(Error::Deserialization(format!(
            "{}[{}]: stored identifier does not match the document name",
            ty.collection(),
            id
        )));
    }

    if let Some(key) = document
        .keys()
        .find(|key| key.as_str() != id_field && schema.field(key).is_none())
    {
        return Err(Error::Deserialization(format!(
            "{}[{}]: unknown field {}",
            ty.collection(),
            id,
            key
        )));
    }
    Ok(())
}
