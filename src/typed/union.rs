//! Union (oneof) normalization.
//!
//! A union groups map fields of which at most one may be set. A
//! discriminator field names the active member; discriminators marked
//! `deduceDiscriminator` are filled in from the single member present.

use super::typed_value::{as_typed_unvalidated, list_item_to_path_element, TypedValue};
use super::validation::{ValidationError, ValidationErrors};
use crate::fieldpath::{Path, PathElement};
use crate::schema::{ElementRelationship, List as SchemaList, Schema, TypeRef, Union};
use crate::value::Value;

impl TypedValue {
    /// Normalizes every union group in the value, bottom-up.
    ///
    /// Fails if any group has more than one member set. Idempotent: running
    /// it on its own output changes nothing.
    pub fn normalize_unions(&self) -> Result<TypedValue, ValidationErrors> {
        let mut walker = UnionWalker {
            schema: self.schema(),
            path: Path::new(),
            errors: ValidationErrors::new(),
        };
        let normalized = walker.walk(self.value(), self.type_ref());
        walker.errors.into_result()?;
        Ok(as_typed_unvalidated(
            normalized,
            self.schema(),
            self.type_ref().clone(),
        ))
    }
}

struct UnionWalker<'a> {
    schema: &'a Schema,
    path: Path,
    errors: ValidationErrors,
}

impl<'a> UnionWalker<'a> {
    fn walk(&mut self, value: &Value, tr: &TypeRef) -> Value {
        let atom = match self.schema.resolve(tr) {
            Some(atom) => atom,
            None => return value.clone(),
        };

        match value {
            Value::Map(fields) => {
                let map_schema = match &atom.map {
                    Some(m) if m.element_relationship != ElementRelationship::Atomic => m,
                    _ => return value.clone(),
                };

                // Children first, so nested unions normalize inside out.
                let mut new_map = crate::value::Map::new();
                for (key, val) in fields.iter() {
                    let field_type = map_schema.field_type(key);
                    self.path.push(PathElement::field_name(key.clone()));
                    new_map.set(key.clone(), self.walk(val, &field_type));
                    self.path.pop();
                }

                for union in &map_schema.unions {
                    self.apply_union(&mut new_map, union);
                }

                Value::Map(new_map)
            }
            Value::List(items) => {
                let list_schema = match &atom.list {
                    Some(l) if l.element_relationship != ElementRelationship::Atomic => l,
                    _ => return value.clone(),
                };
                self.walk_list(items, list_schema)
            }
            _ => value.clone(),
        }
    }

    fn walk_list(&mut self, items: &[Value], list: &SchemaList) -> Value {
        let mut new_items = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let pe = list_item_to_path_element(self.schema, list, &self.path, i, item)
                .unwrap_or_else(|_| PathElement::index(i as i32));
            self.path.push(pe);
            new_items.push(self.walk(item, &list.element_type));
            self.path.pop();
        }
        Value::List(new_items)
    }

    fn apply_union(&mut self, map: &mut crate::value::Map, union: &Union) {
        let present: Vec<(String, String)> = union
            .fields
            .iter()
            .filter(|f| map.get(&f.field_name).is_some_and(|v| !v.is_null()))
            .map(|f| (f.field_name.clone(), f.discriminator_value.clone()))
            .collect();

        if present.len() > 1 {
            let names: Vec<&str> = present.iter().map(|(name, _)| name.as_str()).collect();
            self.errors.add(ValidationError::union(
                self.path.to_string(),
                format!("multiple union members set: {}", names.join(", ")),
            ));
            return;
        }

        let discriminator = match &union.discriminator {
            Some(d) => d,
            None => return,
        };

        if union.deduce_discriminator {
            // The single present member dictates the discriminator,
            // overwriting whatever was there.
            if let Some((_, discriminator_value)) = present.first() {
                map.set(
                    discriminator.clone(),
                    Value::String(discriminator_value.clone()),
                );
            }
            return;
        }

        // Explicit discriminator: if it is set, members it does not select
        // are cleared.
        let selected = match map.get(discriminator) {
            Some(Value::String(dv)) => union
                .field_for_discriminator(dv)
                .map(|f| f.field_name.clone()),
            _ => return,
        };

        for (name, _) in &present {
            if Some(name) != selected.as_ref() {
                map.delete(name);
            }
        }
    }
}
