//! Update and apply operations over a live object and its ownership map.

use super::conflict::{Conflict, Conflicts};
use crate::fieldpath::{Owners, Set};
use crate::typed::{TypedValue, ValidationErrors};
use thiserror::Error;

/// UpdateError represents an error during update.
#[derive(Debug, Clone, Error)]
pub enum UpdateError {
    #[error("validation error: {0}")]
    Validation(ValidationErrors),
}

/// ApplyError represents an error during apply.
#[derive(Debug, Clone, Error)]
pub enum ApplyError {
    #[error("{0}")]
    Conflicts(Conflicts),
    #[error("validation error: {0}")]
    Validation(ValidationErrors),
}

/// Updater reconciles writes from multiple owners against a live object.
///
/// Inputs are never mutated: both operations return a fresh live value and
/// a fresh ownership map.
#[derive(Debug, Clone, Default)]
pub struct Updater {}

impl Updater {
    /// Creates a new Updater.
    pub fn new() -> Self {
        Updater {}
    }

    /// Update models a "write the whole object" operation: the new value
    /// replaces the live object wholesale.
    ///
    /// The writing owner gains every added or modified path (taking those
    /// paths over from any previous owners) and is dropped from every path
    /// its write removed. Removed paths claimed only by other owners keep
    /// their entries untouched.
    pub fn update(
        &self,
        live: &TypedValue,
        new: &TypedValue,
        owners: &Owners,
        owner: &str,
    ) -> Result<(TypedValue, Owners), UpdateError> {
        let compare = live.compare(new).map_err(UpdateError::Validation)?;

        let gained = compare.added.union(&compare.modified);

        let mut new_owners = owners.clone();
        new_owners.strip_from_others(&gained, owner);

        let current = new_owners.get(owner).cloned().unwrap_or_default();
        let updated = current.difference(&compare.removed).union(&gained);
        new_owners.insert(owner, updated);

        Ok((new.clone(), new_owners))
    }

    /// Apply models declarative apply: the config is merged over the live
    /// object, the owner claims the config's fields, and fields the owner
    /// solely claimed before but no longer lists are removed.
    ///
    /// A config field whose live value is claimed by another owner and
    /// differs from the config is a conflict; the whole operation fails
    /// with every conflicting `(path, owner)` pair unless `force` is set,
    /// in which case the conflicting paths move to the applying owner.
    pub fn apply(
        &self,
        live: &TypedValue,
        config: &TypedValue,
        owners: &Owners,
        owner: &str,
        force: bool,
    ) -> Result<(TypedValue, Owners), ApplyError> {
        let merged = live.merge(config).map_err(ApplyError::Validation)?;
        let config_set = config.to_field_set().map_err(ApplyError::Validation)?;

        // What this apply actually changes, relative to the live object.
        let compare = live.compare(&merged).map_err(ApplyError::Validation)?;
        let changed = compare.added.union(&compare.modified);

        // The owner's claim: every config leaf, except paths whose live
        // value already matches the config and which another owner covers
        // (applying an unchanged field does not create co-ownership), and
        // never the paths this apply is not allowed to see change.
        let mut claim = Set::new();
        config_set.iterate(|path| {
            if changed.covers(path) || !owners.covered_by_other(path, owner) {
                claim.insert(path);
            }
        });

        // Fields the owner claimed last time but no longer lists are
        // removed, unless some other owner also claims them.
        let mut to_remove = Set::new();
        if let Some(last) = owners.get(owner) {
            last.difference(&config_set).iterate(|path| {
                if owners.solely_owned_by(path, owner) {
                    to_remove.insert(path);
                }
            });
        }
        let pruned = if to_remove.is_empty() {
            merged
        } else {
            merged.remove_items(&to_remove)
        };

        // Conflicts: changes to paths other owners claim.
        let compare = live.compare(&pruned).map_err(ApplyError::Validation)?;
        let changed = compare.added.union(&compare.modified);

        let mut conflicts = Conflicts::new();
        for (other, set) in owners.iter() {
            if other == owner {
                continue;
            }
            set.intersection(&changed).iterate(|path| {
                conflicts.add(Conflict::new(other.clone(), path.clone()));
            });
        }

        if !conflicts.is_empty() && !force {
            return Err(ApplyError::Conflicts(conflicts));
        }

        let mut new_owners = owners.clone();
        if !conflicts.is_empty() {
            new_owners.strip_from_others(&conflicts.to_set(), owner);
        }
        new_owners.insert(owner, claim);

        Ok((pruned, new_owners))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldpath::{Path, PathElement};
    use crate::typed::Parser;

    const SCHEMA: &str = r#"types:
- name: object
  map:
    fields:
    - name: a
      type:
        scalar: string
    - name: b
      type:
        scalar: string
    - name: x
      type:
        scalar: numeric
"#;

    fn fp(name: &str) -> Path {
        Path::from_elements(vec![PathElement::field_name(name)])
    }

    #[test]
    fn test_update_simple() {
        let parser = Parser::new(SCHEMA).unwrap();
        let pt = parser.type_by_name("object");
        let updater = Updater::new();

        let live = pt.from_yaml(r#"{"a": "1"}"#).unwrap();
        let new = pt.from_yaml(r#"{"a": "2", "b": "3"}"#).unwrap();

        let (result, owners) = updater
            .update(&live, &new, &Owners::new(), "writer")
            .unwrap();

        assert_eq!(result.value(), new.value());
        let set = owners.get("writer").unwrap();
        assert!(set.has(&fp("a")));
        assert!(set.has(&fp("b")));
    }

    #[test]
    fn test_update_takes_over_modified_paths() {
        let parser = Parser::new(SCHEMA).unwrap();
        let pt = parser.type_by_name("object");
        let updater = Updater::new();

        let live = pt.from_yaml(r#"{"a": "1", "b": "keep"}"#).unwrap();
        let new = pt.from_yaml(r#"{"a": "2", "b": "keep"}"#).unwrap();

        let mut owners = Owners::new();
        owners.insert("first", Set::from_paths(vec![fp("a"), fp("b")]));

        let (_, owners) = updater.update(&live, &new, &owners, "second").unwrap();

        assert!(owners.get("second").unwrap().has(&fp("a")));
        let first = owners.get("first").unwrap();
        assert!(!first.has(&fp("a")));
        assert!(first.has(&fp("b")));
    }

    #[test]
    fn test_update_keeps_other_owners_removed_paths() {
        let parser = Parser::new(SCHEMA).unwrap();
        let pt = parser.type_by_name("object");
        let updater = Updater::new();

        let live = pt.from_yaml(r#"{"a": "1", "b": "2"}"#).unwrap();
        let new = pt.from_yaml(r#"{"a": "1"}"#).unwrap();

        let mut owners = Owners::new();
        owners.insert("first", Set::from_paths(vec![fp("b")]));

        let (_, owners) = updater.update(&live, &new, &owners, "second").unwrap();

        // The removed path stays with its owner; the engine only edits what
        // the operation itself implies.
        assert!(owners.get("first").unwrap().has(&fp("b")));
        assert!(!owners.contains("second"));
    }

    #[test]
    fn test_apply_simple() {
        let parser = Parser::new(SCHEMA).unwrap();
        let pt = parser.type_by_name("object");
        let updater = Updater::new();

        let live = pt.from_yaml(r#"{"a": "1"}"#).unwrap();
        let config = pt.from_yaml(r#"{"b": "2"}"#).unwrap();

        let (result, owners) = updater
            .apply(&live, &config, &Owners::new(), "applier", false)
            .unwrap();

        let m = result.value().as_map().unwrap();
        assert!(m.get("a").is_some());
        assert!(m.get("b").is_some());
        assert!(owners.get("applier").unwrap().has(&fp("b")));
    }
}
