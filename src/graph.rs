//! Loaded graphs and cycle breaking
//!
//! Loading shares one instance per (type, id), so a graph with
//! back-references (author and books, movie and genres) is an `Rc` cycle
//! and is never freed on its own. [`detach`] clears every relation field
//! reachable from a root; [`Graph`] does the same when it is dropped.

use crate::entity::{Entity, FieldValue, Link, Shared};
use crate::Result;
use std::collections::HashSet;
use std::ops::Deref;
use std::rc::Rc;

/// Clear every relation field reachable from `root`.
///
/// Returns the number of instances visited. Scalars are left alone, so the
/// instances stay readable; only the references between them are dropped.
pub fn detach(root: &Link) -> Result<usize> {
    let mut seen = HashSet::new();
    let mut visited = Vec::new();
    let mut pending = vec![root.clone()];

    while let Some(link) = pending.pop() {
        if !seen.insert(link.addr()) {
            continue;
        }

        for (field, relationship) in link.entity_type().schema().relations() {
            match link.get_field(field)? {
                FieldValue::One(Some(next)) => pending.push(next),
                FieldValue::Many(next) => pending.extend(next),
                _ => {}
            }

            let cleared = if relationship.is_to_many() {
                FieldValue::Many(Vec::new())
            } else {
                FieldValue::One(None)
            };
            link.set_field(field, cleared)?;
        }
        visited.push(link);
    }

    tracing::debug!("Detached {} instance(s) from {:?}", visited.len(), root);
    Ok(visited.len())
}

/// A loaded entity whose graph is detached when the handle is dropped.
///
/// Clones of instances taken out of the graph stay alive but lose their
/// references on drop. Use [`Graph::keep`] to hold on to the graph as is.
pub struct Graph<T: Entity> {
    root: Shared<T>,
    attached: bool,
}

impl<T: Entity> Graph<T> {
    pub fn new(root: Shared<T>) -> Self {
        Self { root, attached: true }
    }

    pub fn root(&self) -> &Shared<T> {
        &self.root
    }

    /// Give up the handle without detaching; the caller owns any cycle
    pub fn keep(mut self) -> Shared<T> {
        self.attached = false;
        Rc::clone(&self.root)
    }
}

impl<T: Entity> Deref for Graph<T> {
    type Target = Shared<T>;

    fn deref(&self) -> &Self::Target {
        &self.root
    }
}

impl<T: Entity> Drop for Graph<T> {
    fn drop(&mut self) {
        if !self.attached {
            return;
        }
        if let Err(e) = detach(&Link::new(&self.root)) {
            tracing::warn!("Could not detach loaded graph: {}", e);
        }
    }
}
