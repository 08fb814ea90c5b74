//! Equality comparisons for schema types.

use super::elements::*;

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.types.len() == other.types.len()
            && self
                .types
                .iter()
                .zip(other.types.iter())
                .all(|(a, b)| a == b)
    }
}

impl Eq for Schema {}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.named_type == other.named_type
            && self.element_relationship == other.element_relationship
            && self.inlined == other.inlined
    }
}

impl Eq for TypeRef {}

impl PartialEq for TypeDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.atom == other.atom
    }
}

impl Eq for TypeDef {}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.scalar == other.scalar
            && self.list == other.list
            && self.map == other.map
            && self.untyped == other.untyped
    }
}

impl Eq for Atom {}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.element_type == other.element_type
            && self.element_relationship == other.element_relationship
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a == b)
            && self.unions == other.unions
    }
}

impl Eq for Map {}

impl PartialEq for StructField {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.field_type == other.field_type
            && self.default == other.default
    }
}

impl Eq for StructField {}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.element_type == other.element_type
            && self.element_relationship == other.element_relationship
            && self.keys == other.keys
    }
}

impl Eq for List {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_equality() {
        let a = Atom {
            scalar: Some(Scalar::String),
            ..Default::default()
        };
        let b = Atom {
            scalar: Some(Scalar::String),
            ..Default::default()
        };
        let c = Atom {
            scalar: Some(Scalar::Numeric),
            ..Default::default()
        };

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Atom::default());
    }

    #[test]
    fn test_type_ref_equality() {
        assert_eq!(TypeRef::named("foo"), TypeRef::named("foo"));
        assert_ne!(TypeRef::named("foo"), TypeRef::named("bar"));

        let with_override = TypeRef {
            named_type: Some("foo".to_string()),
            element_relationship: Some(ElementRelationship::Atomic),
            ..Default::default()
        };
        assert_ne!(TypeRef::named("foo"), with_override);
    }

    #[test]
    fn test_schema_equality() {
        let mk = || {
            Schema::with_types(vec![TypeDef {
                name: "t".to_string(),
                atom: Atom {
                    scalar: Some(Scalar::Boolean),
                    ..Default::default()
                },
            }])
        };
        assert_eq!(mk(), mk());
        assert_ne!(mk(), Schema::new());
    }
}
