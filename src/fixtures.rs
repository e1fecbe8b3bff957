//! Entity types shared by the unit tests

use crate::entity::{Entity, EntityId, FieldValue, Shared};
use crate::schema::{Cascade, Fetch, Relationship, Schema};
use crate::{Error, Result};

// ========== Authors and books (one-to-many, eager, cascade all) ==========

#[derive(Debug, Default)]
pub struct Author {
    pub id: Option<EntityId>,
    pub name: String,
    pub books: Vec<Shared<Book>>,
}

impl Author {
    pub fn with_id(id: EntityId, name: &str) -> Self {
        Self { id: Some(id), name: name.to_string(), ..Self::default() }
    }
}

impl Entity for Author {
    const COLLECTION: &'static str = "authors";

    fn schema() -> Schema {
        Schema::new().id("id").scalar("name").relation(
            "books",
            Relationship::one_to_many::<Book>()
                .cascade(Cascade::ALL)
                .fetch(Fetch::Eager),
        )
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "name" => FieldValue::scalar(&self.name),
            "books" => Ok(FieldValue::many(&self.books)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "name" => self.name = value.into_scalar(field)?,
            "books" => self.books = value.into_many(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

#[derive(Debug, Default)]
pub struct Book {
    pub id: Option<EntityId>,
    pub title: String,
    pub author: Option<Shared<Author>>,
}

impl Book {
    pub fn new(title: &str) -> Self {
        Self { title: title.to_string(), ..Self::default() }
    }

    pub fn with_id(id: EntityId, title: &str) -> Self {
        Self { id: Some(id), ..Self::new(title) }
    }
}

impl Entity for Book {
    const COLLECTION: &'static str = "books";

    fn schema() -> Schema {
        Schema::new()
            .id("id")
            .scalar("title")
            .relation("author", Relationship::to_one::<Author>())
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "title" => FieldValue::scalar(&self.title),
            "author" => Ok(FieldValue::one(&self.author)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "title" => self.title = value.into_scalar(field)?,
            "author" => self.author = value.into_one(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

// ========== Reservations and discounts (to-one, no cascade) ==========

#[derive(Debug, Default)]
pub struct Reservation {
    pub id: Option<EntityId>,
    pub code: String,
    pub discount: Option<Shared<Discount>>,
}

impl Reservation {
    pub fn with_id(id: EntityId, code: &str) -> Self {
        Self { id: Some(id), code: code.to_string(), discount: None }
    }
}

impl Entity for Reservation {
    const COLLECTION: &'static str = "reservations";

    fn schema() -> Schema {
        Schema::new()
            .id("id")
            .scalar("code")
            .relation("discount", Relationship::to_one::<Discount>())
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "code" => FieldValue::scalar(&self.code),
            "discount" => Ok(FieldValue::one(&self.discount)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "code" => self.code = value.into_scalar(field)?,
            "discount" => self.discount = value.into_one(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

#[derive(Debug, Default)]
pub struct Discount {
    pub id: Option<EntityId>,
    pub percent: u8,
}

impl Discount {
    pub fn with_id(id: EntityId, percent: u8) -> Self {
        Self { id: Some(id), percent }
    }
}

impl Entity for Discount {
    const COLLECTION: &'static str = "discounts";

    fn schema() -> Schema {
        Schema::new().id("id").scalar("percent")
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "percent" => FieldValue::scalar(&self.percent),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "percent" => self.percent = value.into_scalar(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

// ========== Persons and passports (to-one with an inverse side) ==========

#[derive(Debug, Default)]
pub struct Person {
    pub id: Option<EntityId>,
    pub name: String,
    pub passport: Option<Shared<Passport>>,
}

impl Person {
    pub fn with_id(id: EntityId, name: &str) -> Self {
        Self { id: Some(id), name: name.to_string(), passport: None }
    }
}

impl Entity for Person {
    const COLLECTION: &'static str = "persons";

    fn schema() -> Schema {
        Schema::new().id("id").scalar("name").relation(
            "passport",
            Relationship::to_one::<Passport>().cascade(Cascade::ALL),
        )
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "name" => FieldValue::scalar(&self.name),
            "passport" => Ok(FieldValue::one(&self.passport)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "name" => self.name = value.into_scalar(field)?,
            "passport" => self.passport = value.into_one(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

#[derive(Debug, Default)]
pub struct Passport {
    pub id: Option<EntityId>,
    pub number: String,
    pub holder: Option<Shared<Person>>,
}

impl Passport {
    pub fn with_id(id: EntityId, number: &str) -> Self {
        Self { id: Some(id), number: number.to_string(), holder: None }
    }
}

impl Entity for Passport {
    const COLLECTION: &'static str = "passports";

    fn schema() -> Schema {
        Schema::new().id("id").scalar("number").relation(
            "holder",
            Relationship::to_one::<Person>().mapped_by("passport"),
        )
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "number" => FieldValue::scalar(&self.number),
            "holder" => Ok(FieldValue::one(&self.holder)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "number" => self.number = value.into_scalar(field)?,
            "holder" => self.holder = value.into_one(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

// ========== Movies and genres (many-to-many, both sides eager) ==========

#[derive(Debug, Default)]
pub struct Movie {
    pub id: Option<EntityId>,
    pub title: String,
    pub genres: Vec<Shared<Genre>>,
}

impl Movie {
    pub fn with_id(id: EntityId, title: &str) -> Self {
        Self { id: Some(id), title: title.to_string(), genres: Vec::new() }
    }
}

impl Entity for Movie {
    const COLLECTION: &'static str = "movies";

    fn schema() -> Schema {
        Schema::new().id("id").scalar("title").relation(
            "genres",
            Relationship::many_to_many::<Genre>()
                .cascade(Cascade::SAVE)
                .fetch(Fetch::Eager),
        )
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "title" => FieldValue::scalar(&self.title),
            "genres" => Ok(FieldValue::many(&self.genres)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "title" => self.title = value.into_scalar(field)?,
            "genres" => self.genres = value.into_many(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

#[derive(Debug, Default)]
pub struct Genre {
    pub id: Option<EntityId>,
    pub name: String,
    pub movies: Vec<Shared<Movie>>,
}

impl Genre {
    pub fn with_id(id: EntityId, name: &str) -> Self {
        Self { id: Some(id), name: name.to_string(), movies: Vec::new() }
    }
}

impl Entity for Genre {
    const COLLECTION: &'static str = "genres";

    fn schema() -> Schema {
        Schema::new().id("id").scalar("name").relation(
            "movies",
            Relationship::many_to_many::<Movie>()
                .mapped_by("genres")
                .fetch(Fetch::Eager),
        )
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "name" => FieldValue::scalar(&self.name),
            "movies" => Ok(FieldValue::many(&self.movies)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "name" => self.name = value.into_scalar(field)?,
            "movies" => self.movies = value.into_many(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

// ========== Halls and seats (one-to-many, lazy) ==========

#[derive(Debug, Default)]
pub struct Hall {
    pub id: Option<EntityId>,
    pub name: String,
    pub seats: Vec<Shared<Seat>>,
}

impl Hall {
    pub fn with_id(id: EntityId, name: &str) -> Self {
        Self { id: Some(id), name: name.to_string(), seats: Vec::new() }
    }
}

impl Entity for Hall {
    const COLLECTION: &'static str = "halls";

    fn schema() -> Schema {
        Schema::new().id("id").scalar("name").relation(
            "seats",
            Relationship::one_to_many::<Seat>().cascade(Cascade::SAVE),
        )
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "name" => FieldValue::scalar(&self.name),
            "seats" => Ok(FieldValue::many(&self.seats)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "name" => self.name = value.into_scalar(field)?,
            "seats" => self.seats = value.into_many(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

#[derive(Debug, Default)]
pub struct Seat {
    pub id: Option<EntityId>,
    pub number: u32,
}

impl Seat {
    pub fn with_id(id: EntityId, number: u32) -> Self {
        Self { id: Some(id), number }
    }
}

impl Entity for Seat {
    const COLLECTION: &'static str = "seats";

    fn schema() -> Schema {
        Schema::new().id("id").scalar("number")
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "number" => FieldValue::scalar(&self.number),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "number" => self.number = value.into_scalar(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

// ========== Linked nodes (self reference, cascade all) ==========

#[derive(Debug, Default)]
pub struct Node {
    pub id: Option<EntityId>,
    pub label: String,
    pub next: Option<Shared<Node>>,
}

impl Node {
    pub fn with_id(id: EntityId, label: &str) -> Self {
        Self { id: Some(id), label: label.to_string(), next: None }
    }
}

impl Entity for Node {
    const COLLECTION: &'static str = "nodes";

    fn schema() -> Schema {
        Schema::new()
            .id("id")
            .scalar("label")
            .relation("next", Relationship::to_one::<Node>().cascade(Cascade::ALL))
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "label" => FieldValue::scalar(&self.label),
            "next" => Ok(FieldValue::one(&self.next)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "label" => self.label = value.into_scalar(field)?,
            "next" => self.next = value.into_one(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

// ========== Inherited schema ==========

fn member_schema() -> Schema {
    Schema::new().id("id").scalar("name")
}

#[derive(Debug, Default)]
pub struct Staff {
    pub id: Option<EntityId>,
    pub name: String,
    pub role: String,
}

impl Staff {
    pub fn with_id(id: EntityId, name: &str, role: &str) -> Self {
        Self { id: Some(id), name: name.to_string(), role: role.to_string() }
    }
}

impl Entity for Staff {
    const COLLECTION: &'static str = "staff";

    fn schema() -> Schema {
        Schema::new().extends(member_schema()).scalar("role")
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "name" => FieldValue::scalar(&self.name),
            "role" => FieldValue::scalar(&self.role),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "name" => self.name = value.into_scalar(field)?,
            "role" => self.role = value.into_scalar(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

// ========== Misdeclared types ==========

/// Persistable, but has no factory
#[derive(Debug)]
pub struct NoFactory {
    pub id: Option<EntityId>,
}

impl Entity for NoFactory {
    const COLLECTION: &'static str = "nofactory";

    fn schema() -> Schema {
        Schema::new().id("id")
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }
}

/// No identifier field
#[derive(Debug, Default)]
pub struct Unidentified {
    pub label: String,
}

impl Entity for Unidentified {
    const COLLECTION: &'static str = "unidentified";

    fn schema() -> Schema {
        Schema::new().scalar("label")
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "label" => FieldValue::scalar(&self.label),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "label" => self.label = value.into_scalar(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }
}

/// Inverse side mapped by a scalar field
#[derive(Debug, Default)]
pub struct BrokenMapping {
    pub id: Option<EntityId>,
    pub book: Option<Shared<Book>>,
}

impl Entity for BrokenMapping {
    const COLLECTION: &'static str = "broken";

    fn schema() -> Schema {
        Schema::new()
            .id("id")
            .relation("book", Relationship::to_one::<Book>().mapped_by("title"))
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "book" => Ok(FieldValue::one(&self.book)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "book" => self.book = value.into_one(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }
}

/// Declares its to-one discount lazy
#[derive(Debug, Default)]
pub struct Ticket {
    pub id: Option<EntityId>,
    pub discount: Option<Shared<Discount>>,
}

impl Entity for Ticket {
    const COLLECTION: &'static str = "tickets";

    fn schema() -> Schema {
        Schema::new()
            .id("id")
            .relation("discount", Relationship::to_one::<Discount>().fetch(Fetch::Lazy))
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "discount" => Ok(FieldValue::one(&self.discount)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "discount" => self.discount = value.into_one(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

/// Collection name with the relation store separator in it
#[derive(Debug, Default)]
pub struct RareBook {
    pub id: Option<EntityId>,
}

impl Entity for RareBook {
    const COLLECTION: &'static str = "rare_books";

    fn schema() -> Schema {
        Schema::new().id("id")
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }
}

/// Claims the books collection for a second type
#[derive(Debug, Default)]
pub struct Impostor {
    pub id: Option<EntityId>,
}

impl Entity for Impostor {
    const COLLECTION: &'static str = "books";

    fn schema() -> Schema {
        Schema::new().id("id")
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }
}

/// Declares a discount reference but holds a book
#[derive(Debug, Default)]
pub struct Misfiled {
    pub id: Option<EntityId>,
    pub book: Option<Shared<Book>>,
}

impl Entity for Misfiled {
    const COLLECTION: &'static str = "misfiled";

    fn schema() -> Schema {
        Schema::new()
            .id("id")
            .relation("book", Relationship::to_one::<Discount>())
    }

    fn get(&self, field: &str) -> Result<FieldValue> {
        match field {
            "id" => FieldValue::scalar(&self.id),
            "book" => Ok(FieldValue::one(&self.book)),
            _ => Err(Error::unknown_field::<Self>(field)),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "id" => self.id = value.into_scalar(field)?,
            "book" => self.book = value.into_one(field)?,
            _ => return Err(Error::unknown_field::<Self>(field)),
        }
        Ok(())
    }
}
