//! Persistent wire forms for fieldpath types.
//!
//! Path elements serialize with a two-character kind prefix (`f:` field,
//! `k:` key tuple, `v:` set value, `i:` index); a `Set` serializes as a
//! nested JSON object of encoded elements, and `Owners` as a JSON object
//! keyed by owner id. Hosts persist these forms and hand them back
//! unchanged.

use super::path::{Path, PathElement};
use super::set::Set;
use super::Owners;
use crate::value::{from_json_value, to_json_value, Field, FieldList, Value};

/// Error type for serialization/deserialization.
#[derive(Debug, Clone)]
pub struct SerializeError {
    pub message: String,
}

impl SerializeError {
    pub fn new(message: impl Into<String>) -> Self {
        SerializeError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SerializeError {}

/// Serializes a PathElement to its string representation.
pub fn serialize_path_element(pe: &PathElement) -> Result<String, SerializeError> {
    match pe {
        PathElement::FieldName(name) => Ok(format!("f:{}", name)),
        PathElement::Value(v) => {
            let json = value_to_json(v)?;
            Ok(format!("v:{}", json))
        }
        PathElement::Key(fields) => {
            let json = field_list_to_json(fields)?;
            Ok(format!("k:{}", json))
        }
        PathElement::Index(i) => Ok(format!("i:{}", i)),
    }
}

/// Deserializes a PathElement from its string representation.
pub fn deserialize_path_element(s: &str) -> Result<PathElement, SerializeError> {
    if s.len() < 2 {
        return Err(SerializeError::new("key must be at least 2 characters long"));
    }

    let prefix = &s[..2];
    let content = &s[2..];

    match prefix {
        "f:" => Ok(PathElement::FieldName(content.to_string())),
        "v:" => {
            let v = json_to_value(content)?;
            Ok(PathElement::Value(v))
        }
        "k:" => {
            let fields = json_to_field_list(content)?;
            Ok(PathElement::Key(fields))
        }
        "i:" => {
            let i = content
                .parse::<i32>()
                .map_err(|e| SerializeError::new(format!("invalid index: {}", e)))?;
            Ok(PathElement::Index(i))
        }
        _ => Err(SerializeError::new(format!(
            "unknown path element type: {}",
            prefix
        ))),
    }
}

fn value_to_json(v: &Value) -> Result<String, SerializeError> {
    serde_json::to_string(&to_json_value(v))
        .map_err(|e| SerializeError::new(format!("JSON error: {}", e)))
}

fn field_list_to_json(fields: &FieldList) -> Result<String, SerializeError> {
    let mut obj = serde_json::Map::new();
    for field in &fields.fields {
        obj.insert(field.name.clone(), to_json_value(&field.value));
    }
    serde_json::to_string(&serde_json::Value::Object(obj))
        .map_err(|e| SerializeError::new(format!("JSON error: {}", e)))
}

fn json_to_value(s: &str) -> Result<Value, SerializeError> {
    let json_value: serde_json::Value = serde_json::from_str(s)
        .map_err(|e| SerializeError::new(format!("JSON parse error: {}", e)))?;
    Ok(from_json_value(&json_value))
}

fn json_to_field_list(s: &str) -> Result<FieldList, SerializeError> {
    let json_value: serde_json::Value = serde_json::from_str(s)
        .map_err(|e| SerializeError::new(format!("JSON parse error: {}", e)))?;

    match json_value {
        serde_json::Value::Object(obj) => Ok(FieldList::with_fields(
            obj.into_iter()
                .map(|(name, v)| Field {
                    name,
                    value: from_json_value(&v),
                })
                .collect(),
        )),
        _ => Err(SerializeError::new("expected JSON object for key")),
    }
}

impl Set {
    /// Serializes the set to JSON bytes. A top-level `"."` entry marks the
    /// root path itself being a member.
    pub fn to_json(&self) -> Result<Vec<u8>, SerializeError> {
        let json_obj = self.to_json_object(self.has(&Path::new()))?;
        serde_json::to_vec(&json_obj).map_err(|e| SerializeError::new(format!("JSON error: {}", e)))
    }

    /// Deserializes a Set from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Set, SerializeError> {
        let json_value: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| SerializeError::new(format!("JSON parse error: {}", e)))?;

        match json_value {
            serde_json::Value::Object(obj) => {
                let root_in_set = obj.contains_key(".");
                let mut set = Self::from_json_object(obj)?;
                if root_in_set {
                    set.insert(&Path::new());
                }
                Ok(set)
            }
            _ => Err(SerializeError::new("expected JSON object")),
        }
    }

    fn to_json_object(
        &self,
        include_self: bool,
    ) -> Result<serde_json::Map<String, serde_json::Value>, SerializeError> {
        let mut result = serde_json::Map::new();

        // "." marks that the path leading here is itself a member.
        if include_self {
            result.insert(
                ".".to_string(),
                serde_json::Value::Object(serde_json::Map::new()),
            );
        }

        let mut entries: Vec<(&PathElement, Option<&Set>)> = Vec::new();
        for member in self.members.iter() {
            entries.push((member, None));
        }
        for (pe, child) in &self.children {
            entries.push((pe, Some(child)));
        }
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut i = 0;
        while i < entries.len() {
            let (pe, child) = entries[i];
            let key = serialize_path_element(pe)?;

            let merged_child = if child.is_none()
                && i + 1 < entries.len()
                && entries[i + 1].0 == pe
            {
                // Both a member and a subtree: one object with a "." marker.
                i += 1;
                entries[i].1
            } else {
                None
            };

            match (child, merged_child) {
                (Some(c), _) => {
                    result.insert(key, serde_json::Value::Object(c.to_json_object(false)?));
                }
                (None, Some(c)) => {
                    result.insert(key, serde_json::Value::Object(c.to_json_object(true)?));
                }
                (None, None) => {
                    result.insert(key, serde_json::Value::Object(serde_json::Map::new()));
                }
            }

            i += 1;
        }

        Ok(result)
    }

    fn from_json_object(
        obj: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Set, SerializeError> {
        let mut set = Set::new();

        for (key, value) in obj {
            if key == "." {
                // Handled by the parent when it sees this child.
                continue;
            }

            let pe = match deserialize_path_element(&key) {
                Ok(pe) => pe,
                Err(e) => {
                    // Skip unknown element kinds for forward compatibility.
                    if e.message.starts_with("unknown path element type") {
                        continue;
                    }
                    return Err(e);
                }
            };

            match value {
                serde_json::Value::Object(child_obj) => {
                    if child_obj.is_empty() {
                        set.members.insert(pe);
                    } else {
                        let is_member = child_obj.contains_key(".");
                        let child_set = Self::from_json_object(child_obj)?;

                        if is_member {
                            set.members.insert(pe.clone());
                        }
                        if !child_set.is_empty() {
                            set.children.insert(pe, child_set);
                        }
                    }
                }
                _ => {
                    return Err(SerializeError::new(format!(
                        "expected object value for key: {}",
                        key
                    )));
                }
            }
        }

        Ok(set)
    }
}

impl Owners {
    /// Serializes the ownership map as a JSON object keyed by owner id, in
    /// owner-id order, each value the owner's path set.
    pub fn to_json(&self) -> Result<Vec<u8>, SerializeError> {
        let mut obj = serde_json::Map::new();
        for (owner, set) in self.iter() {
            let set_obj = set.to_json_object(set.has(&Path::new()))?;
            obj.insert(owner.clone(), serde_json::Value::Object(set_obj));
        }
        serde_json::to_vec(&serde_json::Value::Object(obj))
            .map_err(|e| SerializeError::new(format!("JSON error: {}", e)))
    }

    /// Deserializes an ownership map from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Owners, SerializeError> {
        let json_value: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| SerializeError::new(format!("JSON parse error: {}", e)))?;

        let obj = match json_value {
            serde_json::Value::Object(obj) => obj,
            _ => return Err(SerializeError::new("expected JSON object")),
        };

        let mut owners = Owners::new();
        for (owner, set_value) in obj {
            let set = match set_value {
                serde_json::Value::Object(set_obj) => {
                    let root_in_set = set_obj.contains_key(".");
                    let mut set = Set::from_json_object(set_obj)?;
                    if root_in_set {
                        set.insert(&Path::new());
                    }
                    set
                }
                _ => {
                    return Err(SerializeError::new(format!(
                        "expected object value for owner: {}",
                        owner
                    )));
                }
            };
            if !set.is_empty() {
                owners.insert(owner, set);
            }
        }
        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use super::super::path::Path;
    use super::*;

    #[test]
    fn test_serialize_path_element_field() {
        let pe = PathElement::field_name("foo");
        let s = serialize_path_element(&pe).unwrap();
        assert_eq!(s, "f:foo");

        let pe2 = deserialize_path_element(&s).unwrap();
        assert_eq!(pe, pe2);
    }

    #[test]
    fn test_serialize_path_element_value_types() {
        let test_cases = vec![
            (PathElement::value(Value::Int(1)), "v:1"),
            (PathElement::value(Value::Int(2)), "v:2"),
            (PathElement::value(Value::Bool(true)), "v:true"),
            (PathElement::value(Value::Bool(false)), "v:false"),
            (PathElement::value(Value::String("aa".into())), r#"v:"aa""#),
            (PathElement::value(Value::Float(3.14)), "v:3.14"),
        ];

        for (pe, expected) in test_cases {
            let s = serialize_path_element(&pe).unwrap();
            assert_eq!(s, expected, "serialization mismatch for {:?}", pe);

            let pe2 = deserialize_path_element(&s).unwrap();
            assert_eq!(pe, pe2, "roundtrip mismatch for {:?}", pe);
        }
    }

    #[test]
    fn test_serialize_path_element_index() {
        let pe = PathElement::index(42);
        let s = serialize_path_element(&pe).unwrap();
        assert_eq!(s, "i:42");

        let pe2 = deserialize_path_element(&s).unwrap();
        assert_eq!(pe, pe2);
    }

    #[test]
    fn test_serialize_path_element_key_multifield() {
        let fields = FieldList::with_fields(vec![
            Field {
                name: "protocol".to_string(),
                value: Value::String("tcp".into()),
            },
            Field {
                name: "port".to_string(),
                value: Value::Int(443),
            },
        ]);
        let pe = PathElement::key(fields);
        let s = serialize_path_element(&pe).unwrap();
        // Fields are sorted by name.
        assert_eq!(s, r#"k:{"port":443,"protocol":"tcp"}"#);

        let pe2 = deserialize_path_element(&s).unwrap();
        assert_eq!(pe, pe2);
    }

    #[test]
    fn test_set_json_roundtrip() {
        let mut set = Set::new();
        set.insert(&Path::from_elements(vec![PathElement::field_name("a")]));
        set.insert(&Path::from_elements(vec![PathElement::field_name("b")]));
        set.insert(&Path::from_elements(vec![
            PathElement::field_name("c"),
            PathElement::field_name("d"),
        ]));
        // Both a member and a subtree root.
        set.insert(&Path::from_elements(vec![PathElement::field_name("c")]));

        let json = set.to_json().unwrap();
        let set2 = Set::from_json(&json).unwrap();

        assert!(set.equals(&set2));
    }

    #[test]
    fn test_set_golden_data() {
        let examples = vec![
            r#"{"f:aaa":{},"f:aab":{}}"#,
            r#"{"f:a":{"f:b":{}}}"#,
            r#"{"f:a":{".":{},"f:b":{}}}"#,
            r#"{"k:{\"name\":\"first\"}":{},"v:1":{},"i:3":{}}"#,
        ];

        for example in examples {
            let set = Set::from_json(example.as_bytes()).unwrap();
            let json = set.to_json().unwrap();
            let set2 = Set::from_json(&json).unwrap();
            assert!(set.equals(&set2), "roundtrip failed for {}", example);
        }
    }

    #[test]
    fn test_drop_unknown() {
        // Unknown prefix "r:" should be dropped.
        let input = r#"{"f:aaa":{},"r:aab":{}}"#;
        let set = Set::from_json(input.as_bytes()).unwrap();
        let json = set.to_json().unwrap();
        let json_str = String::from_utf8(json).unwrap();
        assert_eq!(json_str, r#"{"f:aaa":{}}"#);
    }

    #[test]
    fn test_set_root_membership_roundtrip() {
        let mut set = Set::new();
        set.insert(&Path::new());
        set.insert(&Path::from_elements(vec![PathElement::field_name("a")]));

        let json = set.to_json().unwrap();
        let set2 = Set::from_json(&json).unwrap();

        assert!(set2.has(&Path::new()));
        assert!(set.equals(&set2));
    }

    #[test]
    fn test_owners_json_roundtrip() {
        let mut owners = Owners::new();
        owners.insert(
            "alice",
            Set::from_paths(vec![Path::from_elements(vec![PathElement::field_name("x")])]),
        );
        owners.insert(
            "bob",
            Set::from_paths(vec![Path::from_elements(vec![
                PathElement::field_name("list"),
                PathElement::value(Value::Int(1)),
            ])]),
        );

        let json = owners.to_json().unwrap();
        let owners2 = Owners::from_json(&json).unwrap();
        assert_eq!(owners, owners2);

        // Owner ids appear in sorted order.
        let text = String::from_utf8(json).unwrap();
        assert!(text.find("alice").unwrap() < text.find("bob").unwrap());
    }
}
