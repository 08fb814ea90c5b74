//! Field path module - Represents and manages field paths in nested
//! structures, and tracks which owner claims which fields.

mod path;
mod pathelementmap;
mod serialize;
mod set;

pub use path::*;
pub use pathelementmap::*;
pub use serialize::*;
pub use set::*;

use std::collections::BTreeMap;
use std::fmt;

/// Owners maps owner identities to the set of field paths each one claims.
///
/// Owner ids are opaque strings. Logically this is a map from path to the
/// set of owners claiming it; the owner-keyed representation is the
/// canonical persisted form (owner ids in sorted order, each path set in
/// path order) and [`Owners::owners_of`] provides the per-path view.
///
/// No owner ever maps to an empty set; mutating operations prune empty
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owners {
    owners: BTreeMap<String, Set>,
}

impl Owners {
    /// Creates a new empty ownership map.
    pub fn new() -> Self {
        Owners {
            owners: BTreeMap::new(),
        }
    }

    /// Returns the number of owners.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns true if there are no owners.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Gets the path set for an owner.
    pub fn get(&self, owner: &str) -> Option<&Set> {
        self.owners.get(owner)
    }

    /// Inserts or replaces an owner's path set. An empty set removes the
    /// owner instead.
    pub fn insert(&mut self, owner: impl Into<String>, set: Set) {
        let owner = owner.into();
        if set.is_empty() {
            self.owners.remove(&owner);
        } else {
            self.owners.insert(owner, set);
        }
    }

    /// Removes an owner, returning its path set.
    pub fn remove(&mut self, owner: &str) -> Option<Set> {
        self.owners.remove(owner)
    }

    /// Returns true if the owner has an entry.
    pub fn contains(&self, owner: &str) -> bool {
        self.owners.contains_key(owner)
    }

    /// Iterates over owners and their path sets in owner-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Set)> {
        self.owners.iter()
    }

    /// Iterates over owner ids in sorted order.
    pub fn owner_ids(&self) -> impl Iterator<Item = &String> {
        self.owners.keys()
    }

    /// Returns the owners claiming exactly the given path, in owner-id
    /// order.
    pub fn owners_of(&self, path: &Path) -> Vec<&str> {
        self.owners
            .iter()
            .filter(|(_, set)| set.has(path))
            .map(|(owner, _)| owner.as_str())
            .collect()
    }

    /// Returns true if the path is claimed by `owner` and by nobody else.
    pub fn solely_owned_by(&self, path: &Path, owner: &str) -> bool {
        let claimants = self.owners_of(path);
        claimants.len() == 1 && claimants[0] == owner
    }

    /// Returns true if any owner other than `owner` covers the path (claims
    /// it exactly or claims an ancestor of it).
    pub fn covered_by_other(&self, path: &Path, owner: &str) -> bool {
        self.owners
            .iter()
            .any(|(id, set)| id != owner && set.covers(path))
    }

    /// Removes the given paths from every owner except `keep`, pruning
    /// owners left with nothing.
    pub fn strip_from_others(&mut self, paths: &Set, keep: &str) {
        let mut emptied = Vec::new();
        for (id, set) in self.owners.iter_mut() {
            if id == keep {
                continue;
            }
            *set = set.difference(paths);
            if set.is_empty() {
                emptied.push(id.clone());
            }
        }
        for id in emptied {
            self.owners.remove(&id);
        }
    }

    /// Returns the symmetric difference between two ownership maps.
    ///
    /// Owners present on only one side keep their whole set; owners present
    /// on both contribute the symmetric difference of their sets. Owners
    /// whose difference is empty are omitted.
    pub fn difference(&self, other: &Owners) -> Owners {
        let mut diff = Owners::new();

        for (owner, left) in &self.owners {
            match other.owners.get(owner) {
                None => diff.insert(owner.clone(), left.clone()),
                Some(right) => {
                    let set = left.difference(right).union(&right.difference(left));
                    diff.insert(owner.clone(), set);
                }
            }
        }

        for (owner, right) in &other.owners {
            if !self.owners.contains_key(owner) {
                diff.insert(owner.clone(), right.clone());
            }
        }

        diff
    }
}

impl fmt::Display for Owners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (owner, set) in &self.owners {
            writeln!(f, "{}:", owner)?;
            set.iterate(|path| {
                let _ = writeln!(f, "- {}", path);
            });
        }
        Ok(())
    }
}
