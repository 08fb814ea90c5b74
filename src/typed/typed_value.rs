//! TypedValue implementation.
//!
//! A TypedValue pairs a value with its type within a schema; every engine
//! operation is a schema-directed walk over one or two of them. Walks
//! recurse over a single mutable context whose path is pushed and popped in
//! place, so allocation is proportional to tree depth, not node count.

use super::comparison::Comparison;
use super::validation::{ValidationError, ValidationErrors, ValidationOption};
use crate::fieldpath::{Path, PathElement, PathElementMap, PathElementSet, Set};
use crate::schema::{Atom, List as SchemaList, Scalar, Schema, TypeRef};
use crate::value::{from_json_value, Field, FieldList, Value};

/// TypedValue is a Value paired with its schema and type.
#[derive(Debug, Clone)]
pub struct TypedValue {
    value: Value,
    type_ref: TypeRef,
    schema: Schema,
}

/// Creates a new TypedValue after validating it conforms to the schema.
pub fn as_typed(
    value: Value,
    schema: &Schema,
    type_ref: TypeRef,
    opts: &[ValidationOption],
) -> Result<TypedValue, ValidationErrors> {
    let tv = TypedValue {
        value,
        type_ref,
        schema: schema.clone(),
    };
    tv.validate(opts)?;
    Ok(tv)
}

/// Creates a new TypedValue without validation.
/// Use this only when validation has already been done.
pub fn as_typed_unvalidated(value: Value, schema: &Schema, type_ref: TypeRef) -> TypedValue {
    TypedValue {
        value,
        type_ref,
        schema: schema.clone(),
    }
}

impl TypedValue {
    /// Creates a new TypedValue.
    pub fn new(value: Value, schema: Schema, type_ref: TypeRef) -> Self {
        TypedValue {
            value,
            type_ref,
            schema,
        }
    }

    /// Returns a reference to the underlying value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the TypedValue and returns the underlying value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Returns a reference to the type reference.
    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// Returns a reference to the schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Creates an empty TypedValue with the same schema and type.
    pub fn empty(&self) -> TypedValue {
        TypedValue {
            value: Value::Null,
            type_ref: self.type_ref.clone(),
            schema: self.schema.clone(),
        }
    }

    /// Validates the value against the schema, accumulating every error.
    pub fn validate(&self, opts: &[ValidationOption]) -> Result<(), ValidationErrors> {
        let mut walker = ValidateWalker {
            schema: &self.schema,
            path: Path::new(),
            errors: ValidationErrors::new(),
            allow_duplicates: opts.contains(&ValidationOption::AllowDuplicates),
        };
        walker.walk(&self.value, &self.type_ref);
        walker.errors.into_result()
    }

    /// Converts the typed value to a field set containing the leaves of its
    /// separable tree.
    ///
    /// Key fields of associative list elements are identity, not owned
    /// state, and are omitted; an element whose only content is its
    /// identity contributes the element path itself.
    pub fn to_field_set(&self) -> Result<Set, ValidationErrors> {
        let mut walker = FieldSetWalker {
            schema: &self.schema,
            path: Path::new(),
            set: Set::new(),
            errors: ValidationErrors::new(),
        };
        walker.walk(&self.value, &self.type_ref);
        walker.errors.into_result()?;
        Ok(walker.set)
    }

    /// Compares this TypedValue with another of the same type, producing
    /// added/removed/modified path sets.
    pub fn compare(&self, rhs: &TypedValue) -> Result<Comparison, ValidationErrors> {
        if self.type_ref != rhs.type_ref {
            return Err(ValidationErrors::from_error(ValidationError::schema_error(
                "expected objects of the same type",
            )));
        }

        let mut walker = CompareWalker {
            schema: &self.schema,
            path: Path::new(),
            comparison: Comparison::new(),
            errors: ValidationErrors::new(),
        };
        walker.walk(Some(&self.value), Some(&rhs.value), &self.type_ref);
        walker.errors.into_result()?;
        Ok(walker.comparison)
    }

    /// Merges another TypedValue into this one.
    ///
    /// The merge strategy is "keep RHS" at leaves. Maps merge field by
    /// field with LHS insertion order preserved and RHS-only fields
    /// appended in RHS order; associative lists merge element by element
    /// the same way; atomic and positional containers are replaced whole.
    pub fn merge(&self, rhs: &TypedValue) -> Result<TypedValue, ValidationErrors> {
        if self.type_ref != rhs.type_ref {
            return Err(ValidationErrors::from_error(ValidationError::schema_error(
                "expected objects of the same type",
            )));
        }

        let walker = MergeWalker {
            schema: &self.schema,
        };
        let new_value = walker.merge(&self.value, &rhs.value, &self.type_ref);

        Ok(TypedValue {
            value: new_value,
            type_ref: self.type_ref.clone(),
            schema: self.schema.clone(),
        })
    }

    /// Removes the values at the given paths, returning a new TypedValue.
    pub fn remove_items(&self, items: &Set) -> TypedValue {
        let walker = MergeWalker {
            schema: &self.schema,
        };
        let mut path = Path::new();
        let new_value = walker.remove_items(&self.value, &self.type_ref, items, &mut path);
        TypedValue {
            value: new_value,
            type_ref: self.type_ref.clone(),
            schema: self.schema.clone(),
        }
    }

    /// Extracts only the values at (or under) the given paths, returning a
    /// new TypedValue.
    pub fn extract_items(&self, items: &Set) -> TypedValue {
        let walker = MergeWalker {
            schema: &self.schema,
        };
        let mut path = Path::new();
        let new_value = walker.extract_items(&self.value, &self.type_ref, items, &mut path);
        TypedValue {
            value: new_value,
            type_ref: self.type_ref.clone(),
            schema: self.schema.clone(),
        }
    }
}

/// Computes the path element identifying a list item.
///
/// For keyed associative lists the element's key fields are projected out
/// of the item (falling back to schema defaults); for sets the item itself
/// is the identity; positional items are identified by index.
pub fn list_item_to_path_element(
    schema: &Schema,
    list: &SchemaList,
    path: &Path,
    index: usize,
    item: &Value,
) -> Result<PathElement, ValidationError> {
    if list.is_keyed() {
        let map = match item.as_map() {
            Some(m) => m,
            None => {
                return Err(ValidationError::invalid_value(
                    path.to_string(),
                    format!("element {}: keyed list element must be a map", index),
                ));
            }
        };

        let mut fields = Vec::with_capacity(list.keys.len());
        for key in &list.keys {
            match map.get(key) {
                Some(v) if v.is_scalar() && !v.is_null() => fields.push(Field {
                    name: key.clone(),
                    value: v.clone(),
                }),
                Some(_) => {
                    return Err(ValidationError::invalid_value(
                        path.to_string(),
                        format!("element {}: key field {} is not a scalar", index, key),
                    ));
                }
                None => match key_field_default(schema, list, key) {
                    Some(default) => fields.push(Field {
                        name: key.clone(),
                        value: default,
                    }),
                    None => {
                        return Err(ValidationError::missing_key(
                            path.to_string(),
                            index,
                            key.clone(),
                        ));
                    }
                },
            }
        }
        Ok(PathElement::Key(FieldList::with_fields(fields)))
    } else if list.is_set() {
        if item.is_scalar() {
            Ok(PathElement::Value(item.clone()))
        } else {
            Err(ValidationError::invalid_value(
                path.to_string(),
                format!("element {}: set element must be a scalar", index),
            ))
        }
    } else {
        Ok(PathElement::Index(index as i32))
    }
}

/// Looks up the schema default for an associative key field.
fn key_field_default(schema: &Schema, list: &SchemaList, key: &str) -> Option<Value> {
    let atom = schema.resolve(&list.element_type)?;
    let field = atom.map.as_ref()?.find_field(key)?;
    field.default.as_ref().map(from_json_value)
}

/// Picks the atom branch matching the value's shape. Only the built-in
/// deduced/untyped types have more than one branch; single-branch atoms
/// pass through unchanged.
fn deduce_atom(atom: &Atom, value: Option<&Value>) -> Atom {
    if atom.branch_count() <= 1 {
        return atom.clone();
    }

    let branch = match value {
        Some(Value::List(_)) => atom.list.clone().map(|list| Atom {
            list: Some(list),
            ..Default::default()
        }),
        Some(Value::Map(_)) => atom.map.clone().map(|map| Atom {
            map: Some(map),
            ..Default::default()
        }),
        Some(v) if !v.is_null() => atom.scalar.map(|scalar| Atom {
            scalar: Some(scalar),
            ..Default::default()
        }),
        _ => None,
    };

    branch.unwrap_or_else(|| atom.clone())
}

/// Treats explicit null the same as absence: null means "not present at
/// this path on this side".
fn non_null(v: Option<&Value>) -> Option<&Value> {
    match v {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    }
}

fn resolve_error(tr: &TypeRef) -> ValidationError {
    match &tr.named_type {
        Some(name) => ValidationError::schema_error(format!("no type found matching: {}", name)),
        None => ValidationError::schema_error("invalid type reference"),
    }
}

// ---------------------------------------------------------------------------
// Validation walker
// ---------------------------------------------------------------------------

struct ValidateWalker<'a> {
    schema: &'a Schema,
    path: Path,
    errors: ValidationErrors,
    allow_duplicates: bool,
}

impl<'a> ValidateWalker<'a> {
    fn walk(&mut self, value: &Value, tr: &TypeRef) {
        let atom = match self.schema.resolve(tr) {
            Some(atom) => atom,
            None => {
                self.errors.add(resolve_error(tr));
                return;
            }
        };
        let atom = deduce_atom(&atom, Some(value));

        match value {
            Value::Null => {}
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => {
                if let Some(scalar) = &atom.scalar {
                    self.check_scalar(value, scalar);
                } else if atom.untyped.is_none() {
                    self.errors.add(ValidationError::type_mismatch(
                        self.path.to_string(),
                        expected_kind(&atom),
                        value.kind_name(),
                    ));
                }
            }
            Value::List(items) => {
                if let Some(list) = &atom.list {
                    self.walk_list(items, list);
                } else if atom.untyped.is_none() {
                    self.errors.add(ValidationError::type_mismatch(
                        self.path.to_string(),
                        expected_kind(&atom),
                        "list",
                    ));
                }
            }
            Value::Map(fields) => {
                if let Some(map) = &atom.map {
                    self.walk_map(fields, map);
                } else if atom.untyped.is_none() {
                    self.errors.add(ValidationError::type_mismatch(
                        self.path.to_string(),
                        expected_kind(&atom),
                        "map",
                    ));
                }
            }
        }
    }

    fn check_scalar(&mut self, value: &Value, scalar: &Scalar) {
        let valid = match scalar {
            Scalar::Numeric => value.is_numeric(),
            Scalar::String => value.is_string(),
            Scalar::Boolean => value.is_bool(),
            Scalar::Untyped => value.is_scalar(),
        };

        if !valid {
            let expected = match scalar {
                Scalar::Numeric => "numeric",
                Scalar::String => "string",
                Scalar::Boolean => "boolean",
                Scalar::Untyped => "scalar",
            };
            self.errors.add(ValidationError::type_mismatch(
                self.path.to_string(),
                expected,
                value.kind_name(),
            ));
        }
    }

    fn walk_list(&mut self, items: &[Value], list: &SchemaList) {
        let mut seen = PathElementSet::new();

        for (i, item) in items.iter().enumerate() {
            let pe = match list_item_to_path_element(self.schema, list, &self.path, i, item) {
                Ok(pe) => pe,
                Err(e) => {
                    self.errors.add(e);
                    PathElement::index(i as i32)
                }
            };

            if (list.is_keyed() || list.is_set())
                && !self.allow_duplicates
                && seen.contains(&pe)
            {
                self.errors.add(ValidationError::duplicate_key(
                    self.path.to_string(),
                    pe.to_string(),
                ));
            }
            seen.insert(pe.clone());

            self.path.push(pe);
            self.walk(item, &list.element_type);
            self.path.pop();
        }
    }

    fn walk_map(&mut self, fields: &crate::value::Map, map: &crate::schema::Map) {
        for (key, val) in fields.iter() {
            if map.find_field(key).is_none() && map.element_type.is_unset() {
                self.errors.add(ValidationError::unknown_field(
                    self.path.to_string(),
                    key.clone(),
                ));
                continue;
            }
            let field_type = map.field_type(key);
            self.path.push(PathElement::field_name(key.clone()));
            self.walk(val, &field_type);
            self.path.pop();
        }
    }
}

fn expected_kind(atom: &Atom) -> &'static str {
    if atom.scalar.is_some() {
        "scalar"
    } else if atom.list.is_some() {
        "list"
    } else if atom.map.is_some() {
        "map"
    } else {
        "unknown"
    }
}

// ---------------------------------------------------------------------------
// Field set walker
// ---------------------------------------------------------------------------

struct FieldSetWalker<'a> {
    schema: &'a Schema,
    path: Path,
    set: Set,
    errors: ValidationErrors,
}

impl<'a> FieldSetWalker<'a> {
    fn leaf(&mut self) {
        if !self.path.is_empty() {
            self.set.insert(&self.path);
        }
    }

    fn walk(&mut self, value: &Value, tr: &TypeRef) {
        let atom = match self.schema.resolve(tr) {
            Some(atom) => atom,
            None => {
                self.errors.add(resolve_error(tr));
                return;
            }
        };
        let atom = deduce_atom(&atom, Some(value));

        match value {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => {
                self.leaf();
            }
            Value::List(items) => match &atom.list {
                Some(list) => self.walk_list(items, list),
                None => self.leaf(),
            },
            Value::Map(fields) => match &atom.map {
                Some(map) if !map_is_atomic(map) => self.walk_map(fields, map),
                _ => self.leaf(),
            },
        }
    }

    fn walk_list(&mut self, items: &[Value], list: &SchemaList) {
        // Atomic and positional lists have no per-element ownership.
        if !list.is_set() && !list.is_keyed() {
            self.leaf();
            return;
        }
        if items.is_empty() {
            self.leaf();
            return;
        }

        let mut seen = PathElementSet::new();
        for (i, item) in items.iter().enumerate() {
            let pe = match list_item_to_path_element(self.schema, list, &self.path, i, item) {
                Ok(pe) => pe,
                Err(e) => {
                    self.errors.add(e);
                    continue;
                }
            };
            if seen.contains(&pe) {
                self.errors.add(ValidationError::duplicate_key(
                    self.path.to_string(),
                    pe.to_string(),
                ));
                continue;
            }
            seen.insert(pe.clone());

            if list.is_set() {
                self.path.push(pe);
                self.leaf();
                self.path.pop();
                continue;
            }

            // Keyed element: its non-key fields are the leaves; an element
            // with nothing but its identity is itself a leaf.
            self.path.push(pe);
            let mut has_content = false;
            if let Some(m) = item.as_map() {
                let elem_map = self
                    .schema
                    .resolve(&list.element_type)
                    .and_then(|atom| atom.map);
                for (key, val) in m.iter() {
                    if list.keys.iter().any(|k| k == key) {
                        continue;
                    }
                    has_content = true;
                    let field_type = match &elem_map {
                        Some(em) => em.field_type(key),
                        None => TypeRef::default(),
                    };
                    self.path.push(PathElement::field_name(key.clone()));
                    self.walk(val, &field_type);
                    self.path.pop();
                }
            }
            if !has_content {
                self.set.insert(&self.path);
            }
            self.path.pop();
        }
    }

    fn walk_map(&mut self, fields: &crate::value::Map, map: &crate::schema::Map) {
        if fields.is_empty() {
            self.leaf();
            return;
        }
        for (key, val) in fields.iter() {
            let field_type = map.field_type(key);
            self.path.push(PathElement::field_name(key.clone()));
            self.walk(val, &field_type);
            self.path.pop();
        }
    }
}

fn map_is_atomic(map: &crate::schema::Map) -> bool {
    map.element_relationship == crate::schema::ElementRelationship::Atomic
}

fn list_is_atomic(list: &SchemaList) -> bool {
    list.element_relationship == crate::schema::ElementRelationship::Atomic
}

// ---------------------------------------------------------------------------
// Compare walker
// ---------------------------------------------------------------------------

struct CompareWalker<'a> {
    schema: &'a Schema,
    path: Path,
    comparison: Comparison,
    errors: ValidationErrors,
}

impl<'a> CompareWalker<'a> {
    fn walk(&mut self, lhs: Option<&Value>, rhs: Option<&Value>, tr: &TypeRef) {
        let lhs = non_null(lhs);
        let rhs = non_null(rhs);
        if lhs.is_none() && rhs.is_none() {
            return;
        }

        let atom = match self.schema.resolve(tr) {
            Some(atom) => atom,
            None => {
                self.errors.add(resolve_error(tr));
                return;
            }
        };

        // The two sides may deduce different branches of an untyped atom;
        // when their shapes disagree the node is compared as an opaque leaf.
        if let (Some(l), Some(r)) = (lhs, rhs) {
            if shape_rank(l) != shape_rank(r) {
                self.do_leaf(lhs, rhs);
                return;
            }
        }

        let atom = deduce_atom(&atom, rhs.or(lhs));

        if let Some(map) = &atom.map {
            self.do_map(map, lhs, rhs);
        } else if let Some(list) = &atom.list {
            self.do_list(list, lhs, rhs);
        } else if atom.scalar.is_some() || atom.untyped.is_some() {
            self.do_leaf(lhs, rhs);
        } else {
            self.errors.add(resolve_error(tr));
        }
    }

    fn do_leaf(&mut self, lhs: Option<&Value>, rhs: Option<&Value>) {
        match (lhs, rhs) {
            (None, Some(_)) => self.comparison.added.insert(&self.path),
            (Some(_), None) => self.comparison.removed.insert(&self.path),
            (Some(l), Some(r)) => {
                if l != r {
                    self.comparison.modified.insert(&self.path);
                }
            }
            (None, None) => {}
        }
    }

    fn do_map(
        &mut self,
        map: &crate::schema::Map,
        lhs: Option<&Value>,
        rhs: Option<&Value>,
    ) {
        let lhs_map = self.deref_map("lhs", lhs);
        let rhs_map = self.deref_map("rhs", rhs);

        // If both sides are null or empty, treat the node as a leaf: this
        // preserves the empty/null distinction.
        let empty_promote_to_leaf = lhs_map.map_or(true, |m| m.is_empty())
            && rhs_map.map_or(true, |m| m.is_empty());

        if map_is_atomic(map) || empty_promote_to_leaf {
            self.do_leaf(lhs, rhs);
            return;
        }

        // An entirely one-sided subtree is covered by its root alone.
        match (lhs_map, rhs_map) {
            (None, Some(_)) => self.comparison.added.insert(&self.path),
            (Some(_), None) => self.comparison.removed.insert(&self.path),
            (Some(l), Some(r)) => {
                for (key, lval) in l.iter() {
                    let field_type = map.field_type(key);
                    self.path.push(PathElement::field_name(key.clone()));
                    self.walk(Some(lval), r.get(key), &field_type);
                    self.path.pop();
                }
                for (key, rval) in r.iter() {
                    if l.has(key) {
                        continue;
                    }
                    let field_type = map.field_type(key);
                    self.path.push(PathElement::field_name(key.clone()));
                    self.walk(None, Some(rval), &field_type);
                    self.path.pop();
                }
            }
            (None, None) => {}
        }
    }

    fn do_list(&mut self, list: &SchemaList, lhs: Option<&Value>, rhs: Option<&Value>) {
        let lhs_items = self.deref_list("lhs", lhs);
        let rhs_items = self.deref_list("rhs", rhs);

        let empty_promote_to_leaf = lhs_items.map_or(true, |l| l.is_empty())
            && rhs_items.map_or(true, |r| r.is_empty());

        if list_is_atomic(list) || empty_promote_to_leaf {
            self.do_leaf(lhs, rhs);
            return;
        }

        match (lhs_items, rhs_items) {
            (None, Some(_)) => self.comparison.added.insert(&self.path),
            (Some(_), None) => self.comparison.removed.insert(&self.path),
            (Some(l), Some(r)) => self.visit_list_items(list, l, r),
            (None, None) => {}
        }
    }

    fn visit_list_items(&mut self, list: &SchemaList, lhs: &[Value], rhs: &[Value]) {
        // Collect all RHS children first so LHS children can pair with
        // them; RHS enumeration order makes the added output stable.
        let mut observed_rhs: PathElementMap<&Value> = PathElementMap::new(rhs.len());
        let mut rhs_order: Vec<PathElement> = Vec::with_capacity(rhs.len());

        for (i, child) in rhs.iter().enumerate() {
            let pe = match list_item_to_path_element(self.schema, list, &self.path, i, child) {
                Ok(pe) => pe,
                Err(e) => {
                    // Without an identity we cannot report errors deeper in
                    // this element; skip it but keep its siblings.
                    self.errors.add(e);
                    continue;
                }
            };
            if observed_rhs.contains(&pe) {
                self.errors.add(ValidationError::duplicate_key(
                    self.path.to_string(),
                    pe.to_string(),
                ));
                continue;
            }
            observed_rhs.insert(pe.clone(), child);
            rhs_order.push(pe);
        }

        let mut observed_lhs = PathElementSet::new();
        for (i, child) in lhs.iter().enumerate() {
            let pe = match list_item_to_path_element(self.schema, list, &self.path, i, child) {
                Ok(pe) => pe,
                Err(e) => {
                    self.errors.add(e);
                    continue;
                }
            };
            if observed_lhs.contains(&pe) {
                self.errors.add(ValidationError::duplicate_key(
                    self.path.to_string(),
                    pe.to_string(),
                ));
                continue;
            }
            observed_lhs.insert(pe.clone());

            let rhs_child = observed_rhs.get(&pe).copied();
            self.path.push(pe);
            self.walk(Some(child), rhs_child, &list.element_type);
            self.path.pop();
        }

        for pe in rhs_order {
            if observed_lhs.contains(&pe) {
                continue;
            }
            let child = match observed_rhs.get(&pe) {
                Some(child) => *child,
                None => continue,
            };
            self.path.push(pe);
            self.walk(None, Some(child), &list.element_type);
            self.path.pop();
        }
    }

    fn deref_map<'v>(&mut self, side: &str, v: Option<&'v Value>) -> Option<&'v crate::value::Map> {
        match v {
            None => None,
            Some(Value::Map(m)) => Some(m),
            Some(other) => {
                self.errors.add(ValidationError::type_mismatch(
                    format!("{}: {}", side, self.path),
                    "map",
                    other.kind_name(),
                ));
                None
            }
        }
    }

    fn deref_list<'v>(&mut self, side: &str, v: Option<&'v Value>) -> Option<&'v [Value]> {
        match v {
            None => None,
            Some(Value::List(l)) => Some(l.as_slice()),
            Some(other) => {
                self.errors.add(ValidationError::type_mismatch(
                    format!("{}: {}", side, self.path),
                    "list",
                    other.kind_name(),
                ));
                None
            }
        }
    }
}

/// Shape rank for deciding whether two present values can share a branch.
fn shape_rank(v: &Value) -> u8 {
    match v {
        Value::List(_) => 1,
        Value::Map(_) => 2,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Merge / remove / extract walker
// ---------------------------------------------------------------------------

struct MergeWalker<'a> {
    schema: &'a Schema,
}

impl<'a> MergeWalker<'a> {
    /// Merges rhs over lhs. RHS null is an explicit clear.
    fn merge(&self, lhs: &Value, rhs: &Value, tr: &TypeRef) -> Value {
        if rhs.is_null() {
            return Value::Null;
        }
        if lhs.is_null() {
            return rhs.clone();
        }

        let atom = match self.schema.resolve(tr) {
            Some(atom) => atom,
            None => return rhs.clone(),
        };
        let atom = deduce_atom(&atom, Some(rhs));

        match (lhs, rhs) {
            (Value::Map(lhs_fields), Value::Map(rhs_fields)) => match &atom.map {
                Some(map) if !map_is_atomic(map) => self.merge_maps(lhs_fields, rhs_fields, map),
                _ => rhs.clone(),
            },
            (Value::List(lhs_items), Value::List(rhs_items)) => match &atom.list {
                Some(list) if list.is_set() || list.is_keyed() => {
                    self.merge_lists(lhs_items, rhs_items, list)
                }
                _ => rhs.clone(),
            },
            _ => rhs.clone(),
        }
    }

    fn merge_maps(
        &self,
        lhs: &crate::value::Map,
        rhs: &crate::value::Map,
        map: &crate::schema::Map,
    ) -> Value {
        let mut result = crate::value::Map::new();

        // Live keys first, in their own order.
        for (key, lval) in lhs.iter() {
            let merged = match rhs.get(key) {
                Some(rval) => self.merge(lval, rval, &map.field_type(key)),
                None => lval.clone(),
            };
            result.set(key.clone(), merged);
        }

        // Then incoming-only keys, in incoming order.
        for (key, rval) in rhs.iter() {
            if !lhs.has(key) {
                result.set(key.clone(), rval.clone());
            }
        }

        Value::Map(result)
    }

    fn merge_lists(&self, lhs: &[Value], rhs: &[Value], list: &SchemaList) -> Value {
        let path = Path::new();

        let mut rhs_by_pe: PathElementMap<&Value> = PathElementMap::new(rhs.len());
        let mut rhs_order: Vec<(PathElement, &Value)> = Vec::with_capacity(rhs.len());
        for (i, item) in rhs.iter().enumerate() {
            if let Ok(pe) = list_item_to_path_element(self.schema, list, &path, i, item) {
                if !rhs_by_pe.contains(&pe) {
                    rhs_by_pe.insert(pe.clone(), item);
                    rhs_order.push((pe, item));
                }
            }
        }

        let mut lhs_pes = PathElementSet::new();
        let mut result: Vec<Value> = Vec::with_capacity(lhs.len() + rhs.len());

        // Live elements keep their positions, updated in place.
        for (i, item) in lhs.iter().enumerate() {
            match list_item_to_path_element(self.schema, list, &path, i, item) {
                Ok(pe) => {
                    if lhs_pes.contains(&pe) {
                        // Duplicate on the live side; validation reports it,
                        // the merge keeps the first occurrence only.
                        continue;
                    }
                    lhs_pes.insert(pe.clone());
                    match rhs_by_pe.get(&pe).copied() {
                        Some(rval) => {
                            if list.is_keyed() {
                                result.push(self.merge(item, rval, &list.element_type));
                            } else {
                                result.push(rval.clone());
                            }
                        }
                        None => result.push(item.clone()),
                    }
                }
                Err(_) => result.push(item.clone()),
            }
        }

        // Then incoming-only elements, in incoming order.
        for (pe, item) in rhs_order {
            if !lhs_pes.contains(&pe) {
                result.push(item.clone());
            }
        }

        Value::List(result)
    }

    /// Returns a copy of the value with every path in `items` removed.
    fn remove_items(&self, value: &Value, tr: &TypeRef, items: &Set, path: &mut Path) -> Value {
        let atom = match self.schema.resolve(tr) {
            Some(atom) => atom,
            None => return value.clone(),
        };
        let atom = deduce_atom(&atom, Some(value));

        match value {
            Value::List(list_items) => {
                let list = match &atom.list {
                    Some(list) if !list_is_atomic(list) => list,
                    _ => return value.clone(),
                };
                let mut new_items = Vec::with_capacity(list_items.len());
                for (i, item) in list_items.iter().enumerate() {
                    let pe = match list_item_to_path_element(self.schema, list, path, i, item) {
                        Ok(pe) => pe,
                        Err(_) => PathElement::index(i as i32),
                    };
                    path.push(pe);
                    if !items.has(path) {
                        new_items.push(self.remove_items(item, &list.element_type, items, path));
                    }
                    path.pop();
                }
                Value::List(new_items)
            }
            Value::Map(fields) => {
                let map = match &atom.map {
                    Some(map) if !map_is_atomic(map) => map,
                    _ => return value.clone(),
                };
                let mut new_map = crate::value::Map::new();
                for (key, val) in fields.iter() {
                    path.push(PathElement::field_name(key.clone()));
                    if !items.has(path) {
                        let field_type = map.field_type(key);
                        new_map.set(
                            key.clone(),
                            self.remove_items(val, &field_type, items, path),
                        );
                    }
                    path.pop();
                }
                Value::Map(new_map)
            }
            _ => value.clone(),
        }
    }

    /// Returns a copy of the value restricted to the paths in `items` (a
    /// path in the set keeps its whole subtree).
    fn extract_items(&self, value: &Value, tr: &TypeRef, items: &Set, path: &mut Path) -> Value {
        if items.has(path) {
            return value.clone();
        }

        let atom = match self.schema.resolve(tr) {
            Some(atom) => atom,
            None => return Value::Null,
        };
        let atom = deduce_atom(&atom, Some(value));

        match value {
            Value::List(list_items) => {
                let list = match &atom.list {
                    Some(list) if !list_is_atomic(list) => list,
                    _ => return Value::Null,
                };
                let mut new_items = Vec::new();
                for (i, item) in list_items.iter().enumerate() {
                    let pe = match list_item_to_path_element(self.schema, list, path, i, item) {
                        Ok(pe) => pe,
                        Err(_) => PathElement::index(i as i32),
                    };
                    path.push(pe);
                    let extracted = self.extract_items(item, &list.element_type, items, path);
                    if !extracted.is_null() {
                        new_items.push(extracted);
                    }
                    path.pop();
                }
                if new_items.is_empty() {
                    Value::Null
                } else {
                    Value::List(new_items)
                }
            }
            Value::Map(fields) => {
                let map = match &atom.map {
                    Some(map) if !map_is_atomic(map) => map,
                    _ => return Value::Null,
                };
                let mut new_map = crate::value::Map::new();
                for (key, val) in fields.iter() {
                    path.push(PathElement::field_name(key.clone()));
                    let field_type = map.field_type(key);
                    let extracted = self.extract_items(val, &field_type, items, path);
                    if !extracted.is_null() {
                        new_map.set(key.clone(), extracted);
                    }
                    path.pop();
                }
                if new_map.is_empty() {
                    Value::Null
                } else {
                    Value::Map(new_map)
                }
            }
            _ => Value::Null,
        }
    }
}
