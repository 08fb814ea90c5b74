//! Schema module defines a targeted schema language for structured merges
//! and diffs.
//!
//! The model formalizes the tree-shaped configuration objects this engine
//! operates on, so that operations like "apply" are well defined.

mod elements;
mod equals;
mod schemaschema;

pub use elements::*;
pub use schemaschema::SCHEMA_SCHEMA_YAML;
