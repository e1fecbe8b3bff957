//! Entity contract - what a persistable type exposes to the engine
//!
//! The engine never inspects types at runtime. Every entity describes itself
//! through [`Entity::schema`] and moves field values in and out through
//! [`Entity::get`] / [`Entity::set`]. Related instances travel through the
//! engine as type-erased [`Link`] handles and are downcast back to
//! [`Shared<T>`] at the field boundary.
//!
//! Loaded graphs with back-references are `Rc` cycles; see [`crate::graph`]
//! for releasing them.

use crate::schema::Schema;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Identifier of an entity instance. Assigned by the caller, never generated.
pub type EntityId = uuid::Uuid;

/// A live entity instance shared across a loaded graph
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a value as a [`Shared`] instance
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// A type that can be stored in a collection.
///
/// Implementors list their fields in [`Entity::schema`] (identifier first is
/// conventional but not required) and answer `get`/`set` for every field the
/// schema names, identifier included.
pub trait Entity: Sized + 'static {
    /// Collection (directory) name for this type
    const COLLECTION: &'static str;

    /// Field descriptors, in the order documents are written
    fn schema() -> Schema;

    /// Read one field
    fn get(&self, field: &str) -> Result<FieldValue>;

    /// Overwrite one field
    fn set(&mut self, field: &str, value: FieldValue) -> Result<()>;

    /// Blank instance that loading populates field by field.
    ///
    /// Types that return `None` can be saved but not loaded.
    fn instantiate() -> Option<Self> {
        None
    }
}

/// Runtime handle to an entity type: its name, collection and schema.
#[derive(Clone, Copy)]
pub struct EntityType {
    type_id: TypeId,
    name: &'static str,
    collection: &'static str,
    schema: fn() -> Schema,
    instantiate: fn() -> Option<Link>,
}

impl EntityType {
    pub fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
            collection: T::COLLECTION,
            schema: T::schema,
            instantiate: instantiate_link::<T>,
        }
    }

    /// Unqualified type name, used in error messages
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn schema(&self) -> Schema {
        (self.schema)()
    }

    /// Create a blank instance, if the type provides a factory
    pub fn instantiate(&self) -> Option<Link> {
        (self.instantiate)()
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityType {}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.collection)
    }
}

fn instantiate_link<T: Entity>() -> Option<Link> {
    T::instantiate().map(|blank| Link::new(&shared(blank)))
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Object-safe view of a `RefCell<T: Entity>`
pub(crate) trait EntityCell {
    fn entity_type(&self) -> EntityType;
    fn get_field(&self, field: &str) -> Result<FieldValue>;
    fn set_field(&self, field: &str, value: FieldValue) -> Result<()>;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Entity> EntityCell for RefCell<T> {
    fn entity_type(&self) -> EntityType {
        EntityType::of::<T>()
    }

    fn get_field(&self, field: &str) -> Result<FieldValue> {
        let entity = self
            .try_borrow()
            .map_err(|_| Error::EntityBorrowed(EntityType::of::<T>().name().to_string()))?;
        entity.get(field)
    }

    fn set_field(&self, field: &str, value: FieldValue) -> Result<()> {
        let mut entity = self
            .try_borrow_mut()
            .map_err(|_| Error::EntityBorrowed(EntityType::of::<T>().name().to_string()))?;
        entity.set(field, value)
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Type-erased handle to a shared entity instance.
///
/// Cloning a link clones the handle, not the entity.
#[derive(Clone)]
pub struct Link(Rc<dyn EntityCell>);

impl Link {
    pub fn new<T: Entity>(entity: &Shared<T>) -> Self {
        let cell: Rc<dyn EntityCell> = entity.clone();
        Self(cell)
    }

    pub fn entity_type(&self) -> EntityType {
        self.0.entity_type()
    }

    /// Recover the concrete instance behind the link
    pub fn downcast<T: Entity>(&self) -> Result<Shared<T>> {
        let found = self.entity_type();
        Rc::clone(&self.0)
            .into_any()
            .downcast::<RefCell<T>>()
            .map_err(|_| {
                Error::SchemaDeclaration(format!(
                    "expected an entity of type {}, found {}",
                    EntityType::of::<T>().name(),
                    found.name()
                ))
            })
    }

    /// True if both links point at the same instance
    pub fn ptr_eq(&self, other: &Link) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }

    /// Address of the shared instance, for identity sets
    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    pub(crate) fn get_field(&self, field: &str) -> Result<FieldValue> {
        self.0.get_field(field)
    }

    pub(crate) fn set_field(&self, field: &str, value: FieldValue) -> Result<()> {
        self.0.set_field(field, value)
    }
}

impl<T: Entity> From<&Shared<T>> for Link {
    fn from(entity: &Shared<T>) -> Self {
        Link::new(entity)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({})", self.entity_type().name())
    }
}

/// Value moved across the entity boundary for one field
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Plain value, serialized generically
    Scalar(serde_json::Value),
    /// Single reference, `None` for null
    One(Option<Link>),
    /// Collection of references
    Many(Vec<Link>),
}

impl FieldValue {
    pub fn scalar<V: Serialize + ?Sized>(value: &V) -> Result<Self> {
        Ok(FieldValue::Scalar(serde_json::to_value(value)?))
    }

    pub fn one<T: Entity>(value: &Option<Shared<T>>) -> Self {
        FieldValue::One(value.as_ref().map(Link::new))
    }

    pub fn many<T: Entity>(values: &[Shared<T>]) -> Self {
        FieldValue::Many(values.iter().map(Link::new).collect())
    }

    /// Decode a scalar into the field's Rust type
    pub fn into_scalar<V: DeserializeOwned>(self, field: &str) -> Result<V> {
        match self {
            FieldValue::Scalar(value) => serde_json::from_value(value).map_err(|e| {
                Error::Deserialization(format!("field {}: {}", field, e))
            }),
            other => Err(kind_mismatch(field, "a scalar", &other)),
        }
    }

    pub fn into_one<T: Entity>(self, field: &str) -> Result<Option<Shared<T>>> {
        match self {
            FieldValue::One(Some(link)) => link.downcast::<T>().map(Some),
            FieldValue::One(None) | FieldValue::Scalar(serde_json::Value::Null) => Ok(None),
            other => Err(kind_mismatch(field, "a single reference", &other)),
        }
    }

    pub fn into_many<T: Entity>(self, field: &str) -> Result<Vec<Shared<T>>> {
        match self {
            FieldValue::Many(links) => links.iter().map(Link::downcast::<T>).collect(),
            other => Err(kind_mismatch(field, "a reference collection", &other)),
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Scalar(_) => "a scalar",
            FieldValue::One(_) => "a single reference",
            FieldValue::Many(_) => "a reference collection",
        }
    }
}

fn kind_mismatch(field: &str, expected: &str, found: &FieldValue) -> Error {
    Error::SchemaDeclaration(format!(
        "field {} expects {}, got {}",
        field,
        expected,
        found.kind_name()
    ))
}
