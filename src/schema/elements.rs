//! Core schema elements and type definitions.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use thiserror::Error;

/// Schema is a list of named types.
///
/// Schema types are indexed in a map before the first search so this type
/// should be considered immutable.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDef>,

    #[serde(skip)]
    type_map: OnceCell<HashMap<String, TypeDef>>,

    #[serde(skip)]
    resolved_types: Mutex<HashMap<TypeRefKey, Atom>>,
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        Schema {
            types: self.types.clone(),
            type_map: OnceCell::new(),
            resolved_types: Mutex::new(HashMap::new()),
        }
    }
}

/// Key for caching resolved type references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TypeRefKey {
    named_type: Option<String>,
    element_relationship: Option<ElementRelationship>,
}

impl From<&TypeRef> for TypeRefKey {
    fn from(tr: &TypeRef) -> Self {
        TypeRefKey {
            named_type: tr.named_type.clone(),
            element_relationship: tr.element_relationship,
        }
    }
}

/// TypeDef represents a named type in a schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDef {
    /// Top level types should be named. Every type must have a unique name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(flatten)]
    pub atom: Atom,
}

/// TypeRef either refers to a named type or declares an inlined type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRef {
    /// Reference to a named type in the schema.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "namedType")]
    pub named_type: Option<String>,

    /// Inline type definition.
    #[serde(flatten)]
    pub inlined: Box<Atom>,

    /// If this reference refers to a map-type or list-type, this field
    /// overrides the `ElementRelationship` of the referred type when
    /// resolved.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "elementRelationship"
    )]
    pub element_relationship: Option<ElementRelationship>,
}

impl TypeRef {
    /// Creates a reference to a named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef {
            named_type: Some(name.into()),
            ..Default::default()
        }
    }

    /// Creates a reference to an inline atom.
    pub fn inline(atom: Atom) -> Self {
        TypeRef {
            inlined: Box::new(atom),
            ..Default::default()
        }
    }

    /// Returns true if neither a named type nor an inline atom is present.
    pub fn is_unset(&self) -> bool {
        self.named_type.is_none() && self.inlined.is_unset()
    }
}

/// Atom represents the smallest possible pieces of the type system.
///
/// Logically exactly one branch is set; the built-in deduced/untyped types
/// set several, and the walkers pick a branch from the value's shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Atom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<List>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Map>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub untyped: Option<Untyped>,
}

/// Scalar (AKA "primitive") represents a type which has a single value which
/// is either numeric, string, or boolean, or untyped for any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Numeric,
    String,
    Boolean,
    Untyped,
}

/// Untyped matches any value and is treated as an opaque leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Untyped {}

/// ElementRelationship is an enum of the different possible relationships
/// between the elements of container types (maps, lists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementRelationship {
    /// Associative only applies to lists: elements are identified by the
    /// values of the fields named in `keys`.
    Associative,
    /// Atomic makes container types (lists, maps) behave as scalars / leaf
    /// fields.
    Atomic,
    /// Separable means the items of the container type have no particular
    /// relationship (default behavior for maps).
    Separable,
    /// Set only applies to lists of scalars: elements are identified by
    /// their value. An associative list without keys means the same thing.
    Set,
}

impl Default for ElementRelationship {
    fn default() -> Self {
        ElementRelationship::Separable
    }
}

/// Map is a key-value pair. Keys must be string typed and cannot have
/// multiple components. Maps may also represent a type composed of a number
/// of declared fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Map {
    /// Each struct field appears exactly once in this list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<StructField>,

    /// A Union is a grouping of fields with special rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unions: Vec<Union>,

    /// ElementType is the type of the map's undeclared fields.
    #[serde(default, rename = "elementType")]
    pub element_type: TypeRef,

    /// ElementRelationship states the relationship between the map's items.
    #[serde(
        default,
        skip_serializing_if = "is_default_element_relationship",
        rename = "elementRelationship"
    )]
    pub element_relationship: ElementRelationship,

    #[serde(skip)]
    field_map: OnceCell<HashMap<String, StructField>>,
}

fn is_default_element_relationship(er: &ElementRelationship) -> bool {
    *er == ElementRelationship::Separable
}

/// UnionField is a mapping between a field that is part of the union and the
/// discriminator value that selects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionField {
    /// FieldName is the name of the field that is part of the union.
    #[serde(default, rename = "fieldName")]
    pub field_name: String,

    /// DiscriminatorValue is the value of the discriminator that selects
    /// this field.
    #[serde(default, rename = "discriminatorValue")]
    pub discriminator_value: String,
}

/// Union, or oneof, means that only one of multiple fields of a structure
/// can be set at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Union {
    /// Discriminator, if present, is the name of the field that
    /// discriminates fields in the union.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,

    /// DeduceDiscriminator indicates that the discriminator should be
    /// updated automatically based on the single member field that is set.
    #[serde(default, rename = "deduceDiscriminator")]
    pub deduce_discriminator: bool,

    /// This is the list of fields that belong to this union.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<UnionField>,
}

impl Union {
    /// Returns the member field selected by the given discriminator value.
    pub fn field_for_discriminator(&self, value: &str) -> Option<&UnionField> {
        self.fields.iter().find(|f| f.discriminator_value == value)
    }
}

/// StructField pairs a field name with a field type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructField {
    /// Name is the field name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Type is the field type.
    #[serde(default, rename = "type")]
    pub field_type: TypeRef,

    /// Default value for the field, None if not present. Substitutes for a
    /// missing associative key field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// List represents a type which contains zero or more elements, all of the
/// same subtype.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct List {
    /// ElementType is the type of the list's elements.
    #[serde(default, rename = "elementType")]
    pub element_type: TypeRef,

    /// ElementRelationship states the relationship between the list's
    /// elements.
    #[serde(default, rename = "elementRelationship")]
    pub element_relationship: ElementRelationship,

    /// Keys lists the fields of the element's map type which are to be used
    /// as the keys of the list (for associative lists).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl List {
    /// Returns true if elements are identified by their value: the `set`
    /// relationship, or the associative spelling without keys.
    pub fn is_set(&self) -> bool {
        match self.element_relationship {
            ElementRelationship::Set => true,
            ElementRelationship::Associative => self.keys.is_empty(),
            _ => false,
        }
    }

    /// Returns true if elements are identified by their key fields.
    pub fn is_keyed(&self) -> bool {
        self.element_relationship == ElementRelationship::Associative && !self.keys.is_empty()
    }
}

/// SchemaError reports a structural problem found while validating a schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("type {0} defined more than once")]
    DuplicateType(String),

    #[error("{0}: set-relationship list requires a scalar element type")]
    NonScalarSet(String),

    #[error("{0}: associative list with keys requires a map element type")]
    NonMapAssociative(String),

    #[error("{0}: relationship {1:?} is not valid for this container")]
    InvalidRelationship(String, ElementRelationship),

    #[error("{0}: union member {1} is not a declared field")]
    UnknownUnionMember(String, String),

    #[error("{0}: union discriminator {1} is not a declared field")]
    UnknownDiscriminator(String, String),

    #[error("{0}: deduceDiscriminator requires a discriminator field")]
    DeduceWithoutDiscriminator(String),
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Schema::default()
    }

    /// Creates a schema with the given type definitions.
    pub fn with_types(types: Vec<TypeDef>) -> Self {
        Schema {
            types,
            type_map: OnceCell::new(),
            resolved_types: Mutex::new(HashMap::new()),
        }
    }

    /// FindNamedType returns the referenced TypeDef, if it exists.
    pub fn find_named_type(&self, name: &str) -> Option<&TypeDef> {
        let map = self.type_map.get_or_init(|| {
            self.types
                .iter()
                .map(|t| (t.name.clone(), t.clone()))
                .collect()
        });
        map.get(name)
    }

    fn resolve_no_overrides(&self, tr: &TypeRef) -> Option<Atom> {
        if let Some(ref named) = tr.named_type {
            self.find_named_type(named).map(|t| t.atom.clone())
        } else {
            Some((*tr.inlined).clone())
        }
    }

    /// Resolve returns the atom referenced, whether it is inline or named.
    /// Returns None if the type can't be resolved.
    ///
    /// This allows callers to not care about the difference between a
    /// (possibly inlined) reference and a definition.
    pub fn resolve(&self, tr: &TypeRef) -> Option<Atom> {
        // A plain reference with no overrides resolves directly.
        if tr.element_relationship.is_none() {
            return self.resolve_no_overrides(tr);
        }

        let key = TypeRefKey::from(tr);

        {
            let cache = self.resolved_types.lock().ok()?;
            if let Some(atom) = cache.get(&key) {
                return Some(atom.clone());
            }
        }

        let result = self.resolve_no_overrides(tr)?;
        let element_relationship = tr.element_relationship?;

        let result = if let Some(map) = &result.map {
            let mut map_copy = map.clone();
            map_copy.element_relationship = element_relationship;
            Atom {
                map: Some(map_copy),
                ..Default::default()
            }
        } else if let Some(list) = &result.list {
            let mut list_copy = list.clone();
            list_copy.element_relationship = element_relationship;
            Atom {
                list: Some(list_copy),
                ..Default::default()
            }
        } else {
            // Overrides only apply to containers.
            return None;
        };

        if let Ok(mut cache) = self.resolved_types.lock() {
            cache.insert(key, result.clone());
        }

        Some(result)
    }

    /// Checks the schema for structural problems, accumulating every error.
    pub fn validate(&self) -> Result<(), Vec<SchemaError>> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for td in &self.types {
            if !td.name.is_empty() && !seen.insert(td.name.as_str()) {
                errors.push(SchemaError::DuplicateType(td.name.clone()));
            }
        }

        for td in &self.types {
            let context = if td.name.is_empty() {
                "(anonymous)".to_string()
            } else {
                td.name.clone()
            };
            self.validate_atom(&td.atom, &context, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_atom(&self, atom: &Atom, context: &str, errors: &mut Vec<SchemaError>) {
        if let Some(list) = &atom.list {
            self.validate_list(list, context, errors);
        }
        if let Some(map) = &atom.map {
            self.validate_map(map, context, errors);
        }
    }

    fn validate_list(&self, list: &List, context: &str, errors: &mut Vec<SchemaError>) {
        // Separable on a list means "unspecified": the list is positional.
        if list.element_relationship == ElementRelationship::Set && !list.keys.is_empty() {
            errors.push(SchemaError::InvalidRelationship(
                context.to_string(),
                list.element_relationship,
            ));
        }

        if let Some(elem) = self.resolve(&list.element_type) {
            if list.is_set() && elem.scalar.is_none() {
                errors.push(SchemaError::NonScalarSet(context.to_string()));
            }
            if list.is_keyed() && elem.map.is_none() {
                errors.push(SchemaError::NonMapAssociative(context.to_string()));
            }
        }

        self.validate_atom(&list.element_type.inlined, context, errors);
    }

    fn validate_map(&self, map: &Map, context: &str, errors: &mut Vec<SchemaError>) {
        if matches!(
            map.element_relationship,
            ElementRelationship::Associative | ElementRelationship::Set
        ) {
            errors.push(SchemaError::InvalidRelationship(
                context.to_string(),
                map.element_relationship,
            ));
        }

        for union in &map.unions {
            if union.deduce_discriminator && union.discriminator.is_none() {
                errors.push(SchemaError::DeduceWithoutDiscriminator(context.to_string()));
            }
            if let Some(d) = &union.discriminator {
                if map.find_field(d).is_none() {
                    errors.push(SchemaError::UnknownDiscriminator(
                        context.to_string(),
                        d.clone(),
                    ));
                }
            }
            for member in &union.fields {
                if map.find_field(&member.field_name).is_none() {
                    errors.push(SchemaError::UnknownUnionMember(
                        context.to_string(),
                        member.field_name.clone(),
                    ));
                }
            }
        }

        for field in &map.fields {
            let nested = format!("{}.{}", context, field.name);
            self.validate_atom(&field.field_type.inlined, &nested, errors);
        }
        self.validate_atom(&map.element_type.inlined, context, errors);
    }

    /// Copies this schema into the destination.
    pub fn copy_into(&self, dst: &mut Schema) {
        dst.types = self.types.clone();
        dst.type_map = OnceCell::new();
        dst.resolved_types = Mutex::new(HashMap::new());
    }
}

impl Map {
    /// Creates a new empty Map.
    pub fn new() -> Self {
        Map::default()
    }

    /// Creates a new Map with the given fields.
    pub fn with_fields(fields: Vec<StructField>) -> Self {
        Map {
            fields,
            ..Default::default()
        }
    }

    /// Creates a new Map with the given element type.
    pub fn with_element_type(element_type: TypeRef) -> Self {
        Map {
            element_type,
            ..Default::default()
        }
    }

    /// FindField returns the referenced StructField, if it exists.
    pub fn find_field(&self, name: &str) -> Option<&StructField> {
        let map = self.field_map.get_or_init(|| {
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.clone()))
                .collect()
        });
        map.get(name)
    }

    /// Returns the type of the given field: the declared field type, the
    /// element type for undeclared fields, or untyped.
    pub fn field_type(&self, name: &str) -> TypeRef {
        if let Some(field) = self.find_field(name) {
            field.field_type.clone()
        } else if !self.element_type.is_unset() {
            self.element_type.clone()
        } else {
            TypeRef::inline(Atom {
                untyped: Some(Untyped {}),
                ..Default::default()
            })
        }
    }
}

impl Atom {
    /// Returns true if this atom represents a scalar type.
    pub fn is_scalar(&self) -> bool {
        self.scalar.is_some()
    }

    /// Returns true if this atom represents a list type.
    pub fn is_list(&self) -> bool {
        self.list.is_some()
    }

    /// Returns true if this atom represents a map type.
    pub fn is_map(&self) -> bool {
        self.map.is_some()
    }

    /// Returns true if no branch is set.
    pub fn is_unset(&self) -> bool {
        self.scalar.is_none() && self.list.is_none() && self.map.is_none() && self.untyped.is_none()
    }

    /// Returns the number of branches set.
    pub fn branch_count(&self) -> usize {
        usize::from(self.scalar.is_some())
            + usize::from(self.list.is_some())
            + usize::from(self.map.is_some())
            + usize::from(self.untyped.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_serialization() {
        assert_eq!(
            serde_json::to_string(&Scalar::Numeric).unwrap(),
            "\"numeric\""
        );
        assert_eq!(serde_json::to_string(&Scalar::String).unwrap(), "\"string\"");
        assert_eq!(
            serde_json::to_string(&Scalar::Boolean).unwrap(),
            "\"boolean\""
        );
        assert_eq!(
            serde_json::to_string(&Scalar::Untyped).unwrap(),
            "\"untyped\""
        );
    }

    #[test]
    fn test_element_relationship_serialization() {
        assert_eq!(
            serde_json::to_string(&ElementRelationship::Associative).unwrap(),
            "\"associative\""
        );
        assert_eq!(
            serde_json::to_string(&ElementRelationship::Atomic).unwrap(),
            "\"atomic\""
        );
        assert_eq!(
            serde_json::to_string(&ElementRelationship::Separable).unwrap(),
            "\"separable\""
        );
        assert_eq!(
            serde_json::to_string(&ElementRelationship::Set).unwrap(),
            "\"set\""
        );
    }

    #[test]
    fn test_schema_find_named_type() {
        let schema = Schema::with_types(vec![
            TypeDef {
                name: "string".to_string(),
                atom: Atom {
                    scalar: Some(Scalar::String),
                    ..Default::default()
                },
            },
            TypeDef {
                name: "int".to_string(),
                atom: Atom {
                    scalar: Some(Scalar::Numeric),
                    ..Default::default()
                },
            },
        ]);

        assert!(schema.find_named_type("string").is_some());
        assert!(schema.find_named_type("int").is_some());
        assert!(schema.find_named_type("nonexistent").is_none());
    }

    #[test]
    fn test_schema_resolve_with_override() {
        let schema = Schema::with_types(vec![TypeDef {
            name: "myMap".to_string(),
            atom: Atom {
                map: Some(Map::default()),
                ..Default::default()
            },
        }]);

        let resolved = schema.resolve(&TypeRef::named("myMap")).unwrap();
        assert_eq!(
            resolved.map.unwrap().element_relationship,
            ElementRelationship::Separable
        );

        let type_ref_override = TypeRef {
            named_type: Some("myMap".to_string()),
            element_relationship: Some(ElementRelationship::Atomic),
            ..Default::default()
        };
        let resolved = schema.resolve(&type_ref_override).unwrap();
        assert_eq!(
            resolved.map.unwrap().element_relationship,
            ElementRelationship::Atomic
        );
    }

    #[test]
    fn test_validate_rejects_non_scalar_set() {
        let schema = Schema::with_types(vec![TypeDef {
            name: "badSet".to_string(),
            atom: Atom {
                list: Some(List {
                    element_type: TypeRef::inline(Atom {
                        map: Some(Map::default()),
                        ..Default::default()
                    }),
                    element_relationship: ElementRelationship::Set,
                    keys: vec![],
                }),
                ..Default::default()
            },
        }]);

        let errs = schema.validate().unwrap_err();
        assert!(errs
            .iter()
            .any(|e| matches!(e, SchemaError::NonScalarSet(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_union_member() {
        let schema = Schema::with_types(vec![TypeDef {
            name: "u".to_string(),
            atom: Atom {
                map: Some(Map {
                    fields: vec![StructField {
                        name: "one".to_string(),
                        field_type: TypeRef::inline(Atom {
                            scalar: Some(Scalar::Numeric),
                            ..Default::default()
                        }),
                        default: None,
                    }],
                    unions: vec![Union {
                        discriminator: None,
                        deduce_discriminator: false,
                        fields: vec![UnionField {
                            field_name: "missing".to_string(),
                            discriminator_value: "M".to_string(),
                        }],
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            },
        }]);

        let errs = schema.validate().unwrap_err();
        assert!(errs
            .iter()
            .any(|e| matches!(e, SchemaError::UnknownUnionMember(_, f) if f == "missing")));
    }

    #[test]
    fn test_validate_accepts_associative_no_keys_as_set() {
        let schema = Schema::with_types(vec![TypeDef {
            name: "strings".to_string(),
            atom: Atom {
                list: Some(List {
                    element_type: TypeRef::inline(Atom {
                        scalar: Some(Scalar::String),
                        ..Default::default()
                    }),
                    element_relationship: ElementRelationship::Associative,
                    keys: vec![],
                }),
                ..Default::default()
            },
        }]);

        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_map_find_field() {
        let map = Map {
            fields: vec![
                StructField {
                    name: "name".to_string(),
                    field_type: TypeRef::named("string"),
                    ..Default::default()
                },
                StructField {
                    name: "age".to_string(),
                    field_type: TypeRef::named("int"),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert!(map.find_field("name").is_some());
        assert!(map.find_field("age").is_some());
        assert!(map.find_field("nonexistent").is_none());
    }
}
