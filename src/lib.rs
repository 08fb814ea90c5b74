//! # Fieldwise
//!
//! Schema-aware structured merge and diff for tree-shaped configuration
//! documents.
//!
//! Multiple independent owners ("field managers") each maintain their own
//! view of what they claim inside a shared live object; this library
//! reconciles their updates, applies, removals, and ownership conflicts
//! deterministically.
//!
//! ## Modules
//!
//! - [`schema`] - Type schema definition language for structured merge operations
//! - [`value`] - In-memory representation of YAML/JSON objects
//! - [`fieldpath`] - Canonical field paths, path sets, and the ownership map
//! - [`typed`] - Operations on values with specific schemas (validation,
//!   comparison, merging, union normalization)
//! - [`merge`] - Multi-owner update and apply operations

pub mod fieldpath;
pub mod merge;
pub mod schema;
pub mod typed;
pub mod value;

pub use fieldpath::{Owners, Path, PathElement, PathElementMap, Set as FieldPathSet};
pub use merge::{Conflict, Conflicts, Updater};
pub use schema::Schema;
pub use typed::{Comparison, Parser, TypedValue};
pub use value::Value;
