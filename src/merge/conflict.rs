//! Conflict types for merge operations.

use crate::fieldpath::{Owners, Path, Set};
use std::collections::BTreeMap;
use std::fmt;

/// Conflict represents a single field conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The owner that currently claims the conflicting field.
    pub owner: String,
    /// The path to the conflicting field.
    pub path: Path,
}

impl Conflict {
    /// Creates a new conflict.
    pub fn new(owner: impl Into<String>, path: Path) -> Self {
        Conflict {
            owner: owner.into(),
            path,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conflict with owner '{}' at {}", self.owner, self.path)
    }
}

impl std::error::Error for Conflict {}

/// Conflicts is a collection of conflicts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conflicts {
    conflicts: Vec<Conflict>,
}

impl Conflicts {
    /// Creates a new empty Conflicts collection.
    pub fn new() -> Self {
        Conflicts {
            conflicts: Vec::new(),
        }
    }

    /// Adds a conflict.
    pub fn add(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    /// Returns true if there are no conflicts.
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Returns the number of conflicts.
    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Returns an iterator over the conflicts.
    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter()
    }

    /// Converts the conflicts to a Set of paths.
    pub fn to_set(&self) -> Set {
        let mut set = Set::new();
        for conflict in &self.conflicts {
            set.insert(&conflict.path);
        }
        set
    }

    /// Renders the conflicts grouped by owner, owners sorted, paths in
    /// canonical order within each owner.
    pub fn error(&self) -> String {
        if self.conflicts.is_empty() {
            return String::new();
        }

        let mut by_owner: BTreeMap<&str, Vec<&Path>> = BTreeMap::new();
        for conflict in &self.conflicts {
            by_owner.entry(&conflict.owner).or_default().push(&conflict.path);
        }

        for paths in by_owner.values_mut() {
            paths.sort();
        }

        let mut result = String::new();
        for (i, (owner, paths)) in by_owner.iter().enumerate() {
            if i > 0 {
                result.push('\n');
            }
            result.push_str(&format!("conflicts with \"{}\":", owner));
            for path in paths {
                result.push_str(&format!("\n- {}", path));
            }
        }
        result
    }
}

impl IntoIterator for Conflicts {
    type Item = Conflict;
    type IntoIter = std::vec::IntoIter<Conflict>;

    fn into_iter(self) -> Self::IntoIter {
        self.conflicts.into_iter()
    }
}

impl fmt::Display for Conflicts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error())
    }
}

impl std::error::Error for Conflicts {}

/// Creates a Conflict entry for each path claimed by each owner.
pub fn conflicts_from_owners(owners: &Owners) -> Conflicts {
    let mut conflicts = Conflicts::new();

    for (owner, set) in owners.iter() {
        set.iterate(|path| {
            conflicts.add(Conflict::new(owner.clone(), path.clone()));
        });
    }

    conflicts
}
