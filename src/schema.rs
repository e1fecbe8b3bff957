//! Entity schemas - explicit field and relationship descriptors
//!
//! A [`Schema`] lists an entity's identifier field, its scalar fields and its
//! relationships. Schemas can extend a parent schema; inherited fields come
//! first and the identifier may live on any ancestor.

use crate::entity::{Entity, EntityId, EntityType, FieldValue, Link};
use crate::{Error, Result};
use std::collections::HashSet;

/// Save/delete propagation policy for a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cascade {
    pub save: bool,
    pub delete: bool,
}

impl Cascade {
    pub const NONE: Cascade = Cascade { save: false, delete: false };
    pub const SAVE: Cascade = Cascade { save: true, delete: false };
    pub const DELETE: Cascade = Cascade { save: false, delete: true };
    pub const ALL: Cascade = Cascade { save: true, delete: true };
}

/// When related entities are resolved on load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    Eager,
    Lazy,
}

/// Which side of a relationship emits the authoritative link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owning,
    /// Mapped by the named field on the target type
    Inverse(&'static str),
}

/// Shape of a to-many relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// Each related entity has at most one owner
    OneToMany,
    ManyToMany,
}

/// Relationship declaration for one reference field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    ToOne {
        target: EntityType,
        ownership: Ownership,
        cascade: Cascade,
        fetch: Fetch,
    },
    ToMany {
        target: EntityType,
        multiplicity: Multiplicity,
        ownership: Ownership,
        cascade: Cascade,
        fetch: Fetch,
    },
}

impl Relationship {
    /// Owning to-one reference, eager, no cascade
    pub fn to_one<T: Entity>() -> Self {
        Relationship::ToOne {
            target: EntityType::of::<T>(),
            ownership: Ownership::Owning,
            cascade: Cascade::NONE,
            fetch: Fetch::Eager,
        }
    }

    /// Owning one-to-many collection, lazy, no cascade
    pub fn one_to_many<T: Entity>() -> Self {
        Self::to_many::<T>(Multiplicity::OneToMany)
    }

    /// Owning many-to-many collection, lazy, no cascade
    pub fn many_to_many<T: Entity>() -> Self {
        Self::to_many::<T>(Multiplicity::ManyToMany)
    }

    fn to_many<T: Entity>(multiplicity: Multiplicity) -> Self {
        Relationship::ToMany {
            target: EntityType::of::<T>(),
            multiplicity,
            ownership: Ownership::Owning,
            cascade: Cascade::NONE,
            fetch: Fetch::Lazy,
        }
    }

    /// Make this the inverse side of `field` on the target type
    pub fn mapped_by(mut self, field: &'static str) -> Self {
        match &mut self {
            Relationship::ToOne { ownership, .. } | Relationship::ToMany { ownership, .. } => {
                *ownership = Ownership::Inverse(field);
            }
        }
        self
    }

    pub fn cascade(mut self, policy: Cascade) -> Self {
        match &mut self {
            Relationship::ToOne { cascade, .. } | Relationship::ToMany { cascade, .. } => {
                *cascade = policy;
            }
        }
        self
    }

    /// Fetch policy. Only to-many fields may be lazy; validation rejects a
    /// lazy to-one.
    pub fn fetch(mut self, policy: Fetch) -> Self {
        match &mut self {
            Relationship::ToOne { fetch, .. } | Relationship::ToMany { fetch, .. } => {
                *fetch = policy;
            }
        }
        self
    }

    /// Element type of the relationship
    pub fn target(&self) -> EntityType {
        match self {
            Relationship::ToOne { target, .. } | Relationship::ToMany { target, .. } => *target,
        }
    }

    pub fn ownership(&self) -> Ownership {
        match self {
            Relationship::ToOne { ownership, .. } | Relationship::ToMany { ownership, .. } => *ownership,
        }
    }

    pub fn cascade_policy(&self) -> Cascade {
        match self {
            Relationship::ToOne { cascade, .. } | Relationship::ToMany { cascade, .. } => *cascade,
        }
    }

    pub fn fetch_policy(&self) -> Fetch {
        match self {
            Relationship::ToOne { fetch, .. } | Relationship::ToMany { fetch, .. } => *fetch,
        }
    }

    pub fn is_to_many(&self) -> bool {
        matches!(self, Relationship::ToMany { .. })
    }

    pub fn is_owning(&self) -> bool {
        self.ownership() == Ownership::Owning
    }

    fn shape(&self) -> &'static str {
        match self {
            Relationship::ToOne { .. } => "to-one",
            Relationship::ToMany { multiplicity: Multiplicity::OneToMany, .. } => "one-to-many",
            Relationship::ToMany { multiplicity: Multiplicity::ManyToMany, .. } => "many-to-many",
        }
    }
}

/// What a declared field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Relation(Relationship),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn relationship(&self) -> Option<&Relationship> {
        match &self.kind {
            FieldKind::Relation(relationship) => Some(relationship),
            FieldKind::Scalar => None,
        }
    }

    /// True if the field references other persistable entities
    pub fn is_relation(&self) -> bool {
        self.relationship().is_some()
    }
}

/// Field layout of one entity type
#[derive(Debug, Clone, Default)]
pub struct Schema {
    id_field: Option<&'static str>,
    fields: Vec<FieldDescriptor>,
    parent: Option<Box<Schema>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the identifier field
    pub fn id(mut self, name: &'static str) -> Self {
        self.id_field = Some(name);
        self
    }

    pub fn scalar(mut self, name: &'static str) -> Self {
        self.fields.push(FieldDescriptor { name, kind: FieldKind::Scalar });
        self
    }

    pub fn relation(mut self, name: &'static str, relationship: Relationship) -> Self {
        self.fields.push(FieldDescriptor { name, kind: FieldKind::Relation(relationship) });
        self
    }

    /// Inherit the identifier and fields of a parent schema
    pub fn extends(mut self, parent: Schema) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Identifier field name, searching parent schemas
    pub fn id_field(&self) -> Option<&'static str> {
        self.id_field
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.id_field()))
    }

    /// All declared fields except the identifier, parent fields first
    pub fn fields(&self) -> Vec<&FieldDescriptor> {
        let mut fields = self
            .parent
            .as_ref()
            .map(|parent| parent.fields())
            .unwrap_or_default();
        fields.extend(self.fields.iter());
        fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.field(name)))
    }

    /// Relationship fields only
    pub fn relations(&self) -> Vec<(&'static str, Relationship)> {
        self.fields()
            .into_iter()
            .filter_map(|field| field.relationship().map(|rel| (field.name, *rel)))
            .collect()
    }

    /// Read the identifier of `entity`
    pub fn identifier(&self, entity: &Link) -> Result<EntityId> {
        let type_name = entity.entity_type().name();
        let field = self.require_id_field(type_name)?;

        match entity.get_field(field)? {
            FieldValue::Scalar(serde_json::Value::Null) => Err(Error::MissingIdentifier(format!(
                "entity of type {} has a null identifier",
                type_name
            ))),
            FieldValue::Scalar(value) => serde_json::from_value(value).map_err(|_| {
                Error::SchemaDeclaration(format!(
                    "identifier field {} of {} must hold a UUID",
                    field, type_name
                ))
            }),
            other => Err(Error::SchemaDeclaration(format!(
                "identifier field {} of {} must be a scalar, got {}",
                field,
                type_name,
                other.kind_name()
            ))),
        }
    }

    /// Write `id` into the identifier field of `entity`
    pub fn assign_identifier(&self, entity: &Link, id: EntityId) -> Result<()> {
        let field = self.require_id_field(entity.entity_type().name())?;
        entity.set_field(field, FieldValue::scalar(&id)?)
    }

    pub(crate) fn require_id_field(&self, type_name: &str) -> Result<&'static str> {
        self.id_field().ok_or_else(|| {
            Error::MissingIdentifier(format!("type {} declares no identifier field", type_name))
        })
    }

    /// Check the schema of `owner` for internal and cross-type consistency
    pub fn validate(&self, owner: EntityType) -> Result<()> {
        let id_field = self.require_id_field(owner.name())?;

        let mut seen = HashSet::new();
        for field in self.fields() {
            if field.name == id_field {
                return Err(Error::SchemaDeclaration(format!(
                    "{}.{} is the identifier and cannot also be declared as a field",
                    owner.name(),
                    field.name
                )));
            }
            if !seen.insert(field.name) {
                return Err(Error::SchemaDeclaration(format!(
                    "{}.{} is declared more than once",
                    owner.name(),
                    field.name
                )));
            }
            if let Some(relationship) = field.relationship() {
                if !relationship.is_to_many() && relationship.fetch_policy() == Fetch::Lazy {
                    return Err(Error::SchemaDeclaration(format!(
                        "{}.{} is a to-one reference and cannot be lazy",
                        owner.name(),
                        field.name
                    )));
                }
                validate_mapping(owner, field.name, relationship)?;
            }
        }
        Ok(())
    }
}

/// True if instances of `ty` can be stored
pub fn is_persistable(ty: EntityType) -> bool {
    is_valid_collection_name(ty.collection()) && ty.schema().validate(ty).is_ok()
}

pub(crate) fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '.', '_'])
}

fn validate_mapping(owner: EntityType, field: &str, relationship: &Relationship) -> Result<()> {
    let Ownership::Inverse(mapped_by) = relationship.ownership() else {
        return Ok(());
    };

    if let Relationship::ToMany { multiplicity: Multiplicity::OneToMany, .. } = relationship {
        return Err(Error::SchemaDeclaration(format!(
            "{}.{} is a one-to-many and cannot be the inverse side; declare the mapping on a to-one field instead",
            owner.name(),
            field
        )));
    }

    let target = relationship.target();
    let target_schema = target.schema();
    let mapped = target_schema
        .field(mapped_by)
        .and_then(FieldDescriptor::relationship)
        .ok_or_else(|| {
            Error::SchemaDeclaration(format!(
                "{}.{} is mapped by {}.{}, which is not a declared relationship",
                owner.name(),
                field,
                target.name(),
                mapped_by
            ))
        })?;

    if !mapped.is_owning() {
        return Err(Error::SchemaDeclaration(format!(
            "{}.{} is mapped by {}.{}, which is not the owning side",
            owner.name(),
            field,
            target.name(),
            mapped_by
        )));
    }
    if mapped.target() != owner {
        return Err(Error::SchemaDeclaration(format!(
            "{}.{} targets {}, but {}.{} targets {}",
            owner.name(),
            field,
            target.name(),
            target.name(),
            mapped_by,
            mapped.target().name()
        )));
    }
    if mapped.shape() != relationship.shape() {
        return Err(Error::SchemaDeclaration(format!(
            "{}.{} is {} but {}.{} is {}",
            owner.name(),
            field,
            relationship.shape(),
            target.name(),
            mapped_by,
            mapped.shape()
        )));
    }
    Ok(())
}
