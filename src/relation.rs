//! Relation stores - flat-file link records between two collections
//!
//! One text file per pair of related collections, named by the two
//! collection names sorted and joined with `_` (e.g. `authors_books`).
//! Each line holds one record:
//!
//! ```text
//! <ownerId>_<relatedId>
//! ```

use crate::entity::EntityId;
use crate::{Error, Result};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Position of an identifier within a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Owner,
    Related,
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "owner" | "owning" => Ok(Side::Owner),
            "related" | "inverse" => Ok(Side::Related),
            _ => Err(Error::Deserialization(format!("Unknown relation side: {}", s))),
        }
    }
}

/// One `(ownerId, relatedId)` link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationRecord {
    pub owner: EntityId,
    pub related: EntityId,
}

impl RelationRecord {
    pub fn new(owner: EntityId, related: EntityId) -> Self {
        Self { owner, related }
    }

    /// Parse a record line: `<ownerId>_<relatedId>`
    pub fn parse(line: &str) -> Result<Self> {
        let (owner, related) = line
            .trim()
            .split_once('_')
            .ok_or_else(|| Error::Deserialization(format!("Relation record must contain '_': {}", line)))?;

        let parse_id = |raw: &str| {
            EntityId::parse_str(raw)
                .map_err(|_| Error::Deserialization(format!("Invalid identifier in relation record: {}", raw)))
        };

        Ok(Self {
            owner: parse_id(owner)?,
            related: parse_id(related)?,
        })
    }

    pub fn to_line(&self) -> String {
        format!("{}_{}", self.owner, self.related)
    }

    /// Identifier at the given position
    pub fn at(&self, side: Side) -> EntityId {
        match side {
            Side::Owner => self.owner,
            Side::Related => self.related,
        }
    }

    /// True if `id` occupies the given position
    pub fn mentions(&self, id: EntityId, side: Side) -> bool {
        self.at(side) == id
    }
}

impl fmt::Display for RelationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line())
    }
}

impl FromStr for RelationRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Relation store name for two collections, order-independent
pub fn store_name(a: &str, b: &str) -> String {
    let mut names = [a.to_lowercase(), b.to_lowercase()];
    names.sort();
    names.join("_")
}

/// Append-friendly store of relation records for one pair of collections
#[derive(Debug, Clone)]
pub struct RelationStore {
    name: String,
    path: PathBuf,
}

impl RelationStore {
    /// Store linking collections `a` and `b` under `base_dir`
    pub fn open(base_dir: &Path, a: &str, b: &str) -> Self {
        let name = store_name(a, b);
        let path = base_dir.join(&name);
        Self { name, path }
    }

    /// Store backed by an explicit file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { name, path }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========== Reads ==========

    /// All records in file order; a missing file reads as empty
    pub fn records(&self) -> Result<Vec<RelationRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| Error::read(&self.path, e))?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(RelationRecord::parse)
            .collect()
    }

    /// Identifiers linked to `id`, where `id` sits at `side`
    pub fn related_ids(&self, id: EntityId, side: Side) -> Result<Vec<EntityId>> {
        let other = match side {
            Side::Owner => Side::Related,
            Side::Related => Side::Owner,
        };

        Ok(self
            .records()?
            .into_iter()
            .filter(|record| record.mentions(id, side))
            .map(|record| record.at(other))
            .collect())
    }

    pub fn exists(&self, owner: EntityId, related: EntityId) -> Result<bool> {
        let wanted = RelationRecord::new(owner, related);
        Ok(self.records()?.contains(&wanted))
    }

    // ========== Writes ==========

    /// Append a record unless it is already present
    pub fn save_relation(&self, owner: EntityId, related: EntityId) -> Result<bool> {
        if self.exists(owner, related)? {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::write(&self.path, e))?;
        writeln!(file, "{}", RelationRecord::new(owner, related))
            .map_err(|e| Error::write(&self.path, e))?;

        tracing::debug!("Linked {} -> {} in {}", owner, related, self.name);
        Ok(true)
    }

    /// Link one owner to many related ids; returns the number of new records
    pub fn save_relations(
        &self,
        owner: EntityId,
        related_ids: impl IntoIterator<Item = EntityId>,
    ) -> Result<usize> {
        let mut added = 0;
        for related in related_ids {
            if self.save_relation(owner, related)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Link many owners to one related id; returns the number of new records
    pub fn save_relations_inverse(
        &self,
        owner_ids: impl IntoIterator<Item = EntityId>,
        related: EntityId,
    ) -> Result<usize> {
        let mut added = 0;
        for owner in owner_ids {
            if self.save_relation(owner, related)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove every record where `id` sits at `side`; returns the number removed
    pub fn clear_relation(&self, id: EntityId, side: Side) -> Result<usize> {
        self.retain(|record| !record.mentions(id, side))
    }

    /// Remove exactly the `(owner, related)` record
    pub fn delete_relation(&self, owner: EntityId, related: EntityId) -> Result<bool> {
        let target = RelationRecord::new(owner, related);
        Ok(self.retain(|record| *record != target)? > 0)
    }

    fn retain(&self, keep: impl Fn(&RelationRecord) -> bool) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let records = self.records()?;
        let total = records.len();
        let kept: Vec<_> = records.into_iter().filter(|record| keep(record)).collect();
        let removed = total - kept.len();

        if removed > 0 {
            self.rewrite(&kept)?;
            tracing::debug!("Removed {} record(s) from {}", removed, self.name);
        }
        Ok(removed)
    }

    fn rewrite(&self, records: &[RelationRecord]) -> Result<()> {
        let mut contents = String::new();
        for record in records {
            contents.push_str(&record.to_line());
            contents.push('\n');
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, contents).map_err(|e| Error::write(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::write(&self.path, e)
        })
    }
}
