//! Core value types and operations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Value represents a JSON/YAML value that can be any of the supported types.
///
/// Numeric values compare across `Int` and `Float` by numeric value, so
/// `Value::Int(1)` and `Value::Float(1.0)` are equal and hash identically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

/// Map represents a key-value map where keys are strings.
///
/// Insertion order is preserved so that merged output is stable; equality
/// and ordering are over the key set, not the insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Map {
    pub fields: IndexMap<String, Value>,
}

/// Field represents a single key-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

/// FieldList is a sorted list of fields, used as an associative list key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldList {
    pub fields: Vec<Field>,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.is_int() || self.is_float()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns true for null, bool, numeric, and string values.
    pub fn is_scalar(&self) -> bool {
        !self.is_list() && !self.is_map()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns a short name for the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

fn float_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        // Int and Float share a rank; within it comparison is numeric.
        fn type_rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Float(_) => 2,
                Value::String(_) => 3,
                Value::List(_) => 4,
                Value::Map(_) => 5,
            }
        }

        let rank_cmp = type_rank(self).cmp(&type_rank(other));
        if rank_cmp != Ordering::Equal {
            return rank_cmp;
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => float_cmp(*a, *b),
            (Value::Int(a), Value::Float(b)) => float_cmp(*a as f64, *b),
            (Value::Float(a), Value::Int(b)) => float_cmp(*a, *b as f64),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields
            .iter()
            .all(|(k, v)| other.fields.get(k) == Some(v))
    }
}

impl Eq for Map {}

impl PartialOrd for Map {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Map {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic over (key, value) pairs in sorted key order.
        let mut lhs: Vec<_> = self.fields.iter().collect();
        let mut rhs: Vec<_> = other.fields.iter().collect();
        lhs.sort_by(|a, b| a.0.cmp(b.0));
        rhs.sort_by(|a, b| a.0.cmp(b.0));

        for ((ak, av), (bk, bv)) in lhs.iter().zip(rhs.iter()) {
            let key_cmp = ak.cmp(bk);
            if key_cmp != Ordering::Equal {
                return key_cmp;
            }
            let val_cmp = av.cmp(bv);
            if val_cmp != Ordering::Equal {
                return val_cmp;
            }
        }

        lhs.len().cmp(&rhs.len())
    }
}

impl Map {
    pub fn new() -> Self {
        Map {
            fields: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: String, value: Value) {
        self.fields.insert(key, value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl FieldList {
    pub fn new() -> Self {
        FieldList { fields: Vec::new() }
    }

    /// Creates a FieldList from fields, canonicalizing to name order.
    pub fn with_fields(fields: Vec<Field>) -> Self {
        let mut fl = FieldList { fields };
        fl.sort();
        fl
    }

    pub fn sort(&mut self) {
        self.fields.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compares two FieldLists lexicographically by (name, value) pairs.
    pub fn compare(&self, other: &FieldList) -> Ordering {
        for (a, b) in self.fields.iter().zip(other.fields.iter()) {
            match a.name.cmp(&b.name) {
                Ordering::Equal => {}
                other => return other,
            }
            match a.value.cmp(&b.value) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        self.fields.len().cmp(&other.fields.len())
    }

    /// Returns true if both FieldLists have the same fields and values.
    pub fn equals(&self, other: &FieldList) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.name == b.name && a.value == b.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Must agree with the cross-kind numeric equality above: Int and
        // Float share a rank byte, and floats with an exact integer value
        // hash as that integer.
        match self {
            Value::Null => state.write_u8(0),
            Value::Bool(b) => {
                state.write_u8(1);
                b.hash(state);
            }
            Value::Int(i) => {
                state.write_u8(2);
                i.hash(state);
            }
            Value::Float(f) => {
                state.write_u8(2);
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    (*f as i64).hash(state);
                } else {
                    f.to_bits().hash(state);
                }
            }
            Value::String(s) => {
                state.write_u8(3);
                s.hash(state);
            }
            Value::List(l) => {
                state.write_u8(4);
                l.hash(state);
            }
            Value::Map(m) => {
                state.write_u8(5);
                let mut keys: Vec<_> = m.fields.keys().collect();
                keys.sort();
                for k in keys {
                    k.hash(state);
                    m.fields[k.as_str()].hash(state);
                }
            }
        }
    }
}

impl std::hash::Hash for FieldList {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for field in &self.fields {
            field.name.hash(state);
            field.value.hash(state);
        }
    }
}

impl PartialOrd for FieldList {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldList {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl std::fmt::Display for Value {
    /// Renders scalars in their JSON form; used for paths and diagnostics.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => {
                write!(f, "{}", serde_json::to_string(s).unwrap_or_default())
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", serde_json::to_string(k).unwrap_or_default(), v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Converts a serde_json::Value into a Value.
pub fn from_json_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Null
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(arr) => Value::List(arr.iter().map(from_json_value).collect()),
        serde_json::Value::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                map.set(k.clone(), from_json_value(v));
            }
            Value::Map(map)
        }
    }
}

/// Converts a Value into a serde_json::Value.
pub fn to_json_value(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json_value).collect()),
        Value::Map(map) => {
            let obj: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), to_json_value(v)))
                .collect();
            serde_json::Value::Object(obj)
        }
    }
}

/// Parse a value from JSON.
pub fn from_json(json: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serialize a value to JSON.
pub fn to_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Parse a value from YAML.
pub fn from_yaml(yaml: &str) -> Result<Value, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

/// Serialize a value to YAML.
pub fn to_yaml(value: &Value) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_value_types() {
        assert!(Value::Null.is_null());
        assert!(Value::Bool(true).is_bool());
        assert!(Value::Int(42).is_int());
        assert!(Value::Float(3.14).is_float());
        assert!(Value::String("hello".into()).is_string());
        assert!(Value::List(vec![]).is_list());
        assert!(Value::Map(Map::new()).is_map());
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Bool(true), Value::Bool(true));
        assert_ne!(Value::Bool(true), Value::Bool(false));
        assert_eq!(Value::Int(42), Value::Int(42));
        assert_eq!(Value::String("hello".into()), Value::String("hello".into()));
    }

    #[test]
    fn test_cross_kind_numeric_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Float(1.0), Value::Int(1));
        assert_ne!(Value::Int(1), Value::Float(1.5));
        assert_eq!(hash_of(&Value::Int(1)), hash_of(&Value::Float(1.0)));
    }

    #[test]
    fn test_value_ordering_corpus() {
        // (a, b, expect_equal); otherwise a < b strictly.
        let table: Vec<(Value, Value, bool)> = vec![
            (Value::Float(1.14), Value::Float(3.14), false),
            (Value::Float(1.0), Value::Float(1.0), true),
            (Value::Float(1.0), Value::Int(1), true),
            (Value::Float(1.0), Value::Int(2), false),
            (Value::Float(1.0), Value::String("aoeu".into()), false),
            (Value::Bool(false), Value::Int(1), false),
            (Value::Null, Value::Bool(false), false),
            (Value::Int(1), Value::Int(2), false),
            (Value::String("b-12".into()), Value::String("b-9".into()), false),
            (Value::String("x".into()), Value::List(vec![]), false),
            (Value::List(vec![Value::Int(1)]), Value::List(vec![Value::Int(2)]), false),
            (
                Value::List(vec![Value::Int(1)]),
                Value::List(vec![Value::Int(1), Value::Int(1)]),
                false,
            ),
            (Value::List(vec![]), Value::Map(Map::new()), false),
        ];

        for (a, b, eq) in table {
            if eq {
                assert_eq!(a.cmp(&b), Ordering::Equal, "{} vs {}", a, b);
                assert_eq!(b.cmp(&a), Ordering::Equal, "{} vs {}", b, a);
            } else {
                assert_eq!(a.cmp(&b), Ordering::Less, "{} vs {}", a, b);
                assert_eq!(b.cmp(&a), Ordering::Greater, "{} vs {}", b, a);
            }
        }
    }

    #[test]
    fn test_map_ordering() {
        let mk = |pairs: Vec<(&str, i64)>| {
            let mut m = Map::new();
            for (k, v) in pairs {
                m.set(k.to_string(), Value::Int(v));
            }
            Value::Map(m)
        };

        assert_eq!(
            mk(vec![("carotine", 1)]).cmp(&mk(vec![("ethanol", 1)])),
            Ordering::Less
        );
        assert_eq!(
            mk(vec![("carotine", 1)]).cmp(&mk(vec![("ethanol", 1), ("carotine", 2)])),
            Ordering::Less
        );
        assert_eq!(
            mk(vec![("carotine", 1)]).cmp(&mk(vec![("carotine", 1), ("ethanol", 1)])),
            Ordering::Less
        );
        assert_eq!(
            mk(vec![("carotine", 1), ("ethanol", 1)]).cmp(&mk(vec![("carotine", 2)])),
            Ordering::Less
        );
        // Equality ignores insertion order.
        assert_eq!(mk(vec![("a", 1), ("b", 2)]), mk(vec![("b", 2), ("a", 1)]));
    }

    #[test]
    fn test_map_preserves_insertion_order() {
        let mut map = Map::new();
        map.set("z".into(), Value::Int(1));
        map.set("a".into(), Value::Int(2));
        map.set("m".into(), Value::Int(3));

        let keys: Vec<&String> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_map_operations() {
        let mut map = Map::new();
        assert!(map.is_empty());

        map.set("key".into(), Value::String("value".into()));
        assert!(!map.is_empty());
        assert!(map.has("key"));
        assert_eq!(map.get("key"), Some(&Value::String("value".into())));

        map.delete("key");
        assert!(!map.has("key"));
    }

    #[test]
    fn test_json_roundtrip() {
        let value = Value::Map({
            let mut m = Map::new();
            m.set("name".into(), Value::String("test".into()));
            m.set("count".into(), Value::Int(42));
            m
        });

        let json = to_json(&value).unwrap();
        let parsed = from_json(&json).unwrap();
        assert_eq!(value, parsed);
    }

    #[test]
    fn test_yaml_preserves_document_order() {
        let value = from_yaml("z: 1\na: 2\nm: 3\n").unwrap();
        let map = value.as_map().unwrap();
        let keys: Vec<&String> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_display_json_forms() {
        assert_eq!(format!("{}", Value::String("a".into())), r#""a""#);
        assert_eq!(format!("{}", Value::Int(2)), "2");
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Null), "null");
    }

    #[test]
    fn test_field_list_compare() {
        let fl1 = FieldList::with_fields(vec![
            Field { name: "a".into(), value: Value::Int(1) },
            Field { name: "b".into(), value: Value::Int(2) },
        ]);
        let fl2 = FieldList::with_fields(vec![
            Field { name: "a".into(), value: Value::Int(1) },
            Field { name: "b".into(), value: Value::Int(2) },
        ]);
        let fl3 = FieldList::with_fields(vec![
            Field { name: "a".into(), value: Value::Int(1) },
            Field { name: "c".into(), value: Value::Int(2) },
        ]);
        let fl4 = FieldList::with_fields(vec![
            Field { name: "a".into(), value: Value::Int(1) },
        ]);

        assert_eq!(fl1.compare(&fl2), Ordering::Equal);
        assert!(fl1.equals(&fl2));

        assert_eq!(fl1.compare(&fl3), Ordering::Less);
        assert!(!fl1.equals(&fl3));

        assert_eq!(fl4.compare(&fl1), Ordering::Less);
    }

    #[test]
    fn test_field_list_canonical_order() {
        let fl = FieldList::with_fields(vec![
            Field { name: "b".into(), value: Value::Int(2) },
            Field { name: "a".into(), value: Value::Int(1) },
        ]);
        assert_eq!(fl.fields[0].name, "a");
        assert_eq!(fl.fields[1].name, "b");
    }
}
