//! Tests for symmetric difference (compare) operations.

use crate::fieldpath::{Path, PathElement};
use crate::typed::Parser;
use crate::value::{Field, FieldList, Value};

const PAIR_SCHEMA: &str = r#"types:
- name: stringPair
  map:
    fields:
    - name: key
      type:
        scalar: string
    - name: value
      type:
        namedType: __untyped_atomic_
- name: __untyped_atomic_
  scalar: untyped
  list:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
  map:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
"#;

const LIST_SCHEMA: &str = r#"types:
- name: lists
  map:
    fields:
    - name: keyed
      type:
        list:
          elementType:
            namedType: item
          elementRelationship: associative
          keys:
          - k
    - name: strings
      type:
        list:
          elementType:
            scalar: string
          elementRelationship: associative
    - name: positional
      type:
        list:
          elementType:
            scalar: numeric
- name: item
  map:
    fields:
    - name: k
      type:
        scalar: string
    - name: v
      type:
        scalar: numeric
"#;

const NESTED_SCHEMA: &str = r#"types:
- name: nested
  map:
    fields:
    - name: inner
      type:
        map:
          elementType:
            scalar: numeric
"#;

/// Helper to create a path from field names.
fn path(elements: Vec<&str>) -> Path {
    Path::from_elements(
        elements
            .into_iter()
            .map(PathElement::field_name)
            .collect(),
    )
}

/// Helper to create a key-based field path element.
fn key_element(pairs: Vec<(&str, Value)>) -> PathElement {
    let fields: Vec<Field> = pairs
        .into_iter()
        .map(|(k, v)| Field {
            name: k.to_string(),
            value: v,
        })
        .collect();
    PathElement::Key(FieldList::with_fields(fields))
}

#[test]
fn test_symdiff_simple_pair_same() {
    let parser = Parser::new(PAIR_SCHEMA).unwrap();
    let pt = parser.type_by_name("stringPair");

    let lhs = pt.from_yaml(r#"{"key":"foo","value":1}"#).unwrap();
    let rhs = pt.from_yaml(r#"{"key":"foo","value":1}"#).unwrap();

    let comparison = lhs.compare(&rhs).unwrap();
    assert!(comparison.is_same(), "got: {}", comparison);
}

#[test]
fn test_symdiff_simple_pair_value_modified() {
    let parser = Parser::new(PAIR_SCHEMA).unwrap();
    let pt = parser.type_by_name("stringPair");

    let lhs = pt.from_yaml(r#"{"key":"foo","value":{}}"#).unwrap();
    let rhs = pt.from_yaml(r#"{"key":"foo","value":1}"#).unwrap();

    let comparison = lhs.compare(&rhs).unwrap();

    assert!(comparison.removed.is_empty(), "expected no removed fields");
    assert!(
        comparison.modified.has(&path(vec!["value"])),
        "expected value to be modified"
    );
    assert!(comparison.added.is_empty(), "expected no added fields");
}

#[test]
fn test_symdiff_simple_pair_field_change() {
    let parser = Parser::new(PAIR_SCHEMA).unwrap();
    let pt = parser.type_by_name("stringPair");

    let lhs = pt.from_yaml(r#"{"key":"foo"}"#).unwrap();
    let rhs = pt.from_yaml(r#"{"value":true}"#).unwrap();

    let comparison = lhs.compare(&rhs).unwrap();

    assert!(comparison.removed.has(&path(vec!["key"])));
    assert!(comparison.modified.is_empty());
    assert!(comparison.added.has(&path(vec!["value"])));
}

#[test]
fn test_symdiff_null_vs_value_is_added() {
    let parser = Parser::new(PAIR_SCHEMA).unwrap();
    let pt = parser.type_by_name("stringPair");

    // Explicit null counts as "not present on this side".
    let lhs = pt.from_yaml(r#"{"key":null}"#).unwrap();
    let rhs = pt.from_yaml(r#"{"key":"foo"}"#).unwrap();

    let comparison = lhs.compare(&rhs).unwrap();
    assert!(comparison.added.has(&path(vec!["key"])));
    assert!(comparison.modified.is_empty());
    assert!(comparison.removed.is_empty());
}

#[test]
fn test_symdiff_empty_map_added_as_leaf() {
    let parser = Parser::new(NESTED_SCHEMA).unwrap();
    let pt = parser.type_by_name("nested");

    let lhs = pt.from_yaml(r#"{}"#).unwrap();
    let rhs = pt.from_yaml(r#"{"inner":{}}"#).unwrap();

    let comparison = lhs.compare(&rhs).unwrap();

    assert!(comparison.removed.is_empty());
    assert!(comparison.modified.is_empty());
    assert!(comparison.added.has(&path(vec!["inner"])));
}

#[test]
fn test_symdiff_one_sided_subtree_records_root_only() {
    let parser = Parser::new(NESTED_SCHEMA).unwrap();
    let pt = parser.type_by_name("nested");

    let lhs = pt.from_yaml(r#"{}"#).unwrap();
    let rhs = pt.from_yaml(r#"{"inner":{"a":1,"b":2}}"#).unwrap();

    let comparison = lhs.compare(&rhs).unwrap();

    // The subtree is covered by one entry; children are not enumerated.
    assert!(comparison.added.has(&path(vec!["inner"])));
    assert!(!comparison.added.has(&path(vec!["inner", "a"])));
    assert!(!comparison.added.has(&path(vec!["inner", "b"])));
    assert_eq!(comparison.added.size(), 1);
}

#[test]
fn test_symdiff_associative_reorder_is_empty() {
    let parser = Parser::new(LIST_SCHEMA).unwrap();
    let pt = parser.type_by_name("lists");

    let lhs = pt.from_yaml(r#"{"keyed":[{"k":"a"},{"k":"b"}]}"#).unwrap();
    let rhs = pt.from_yaml(r#"{"keyed":[{"k":"b"},{"k":"a"}]}"#).unwrap();

    let comparison = lhs.compare(&rhs).unwrap();
    assert!(comparison.is_same(), "got: {}", comparison);
}

#[test]
fn test_symdiff_associative_element_changes() {
    let parser = Parser::new(LIST_SCHEMA).unwrap();
    let pt = parser.type_by_name("lists");

    let lhs = pt
        .from_yaml(r#"{"keyed":[{"k":"a","v":1},{"k":"b","v":2}]}"#)
        .unwrap();
    let rhs = pt
        .from_yaml(r#"{"keyed":[{"k":"a","v":3},{"k":"c","v":4}]}"#)
        .unwrap();

    let comparison = lhs.compare(&rhs).unwrap();

    let key_a = key_element(vec![("k", Value::String("a".into()))]);
    let key_b = key_element(vec![("k", Value::String("b".into()))]);
    let key_c = key_element(vec![("k", Value::String("c".into()))]);

    let mut a_v = path(vec!["keyed"]);
    a_v.push(key_a);
    a_v.push(PathElement::field_name("v"));
    assert!(comparison.modified.has(&a_v), "got: {}", comparison);

    let mut b = path(vec!["keyed"]);
    b.push(key_b);
    assert!(comparison.removed.has(&b), "got: {}", comparison);

    let mut c = path(vec!["keyed"]);
    c.push(key_c);
    assert!(comparison.added.has(&c), "got: {}", comparison);
}

#[test]
fn test_symdiff_set_membership() {
    let parser = Parser::new(LIST_SCHEMA).unwrap();
    let pt = parser.type_by_name("lists");

    let lhs = pt.from_yaml(r#"{"strings":["a","b"]}"#).unwrap();
    let rhs = pt.from_yaml(r#"{"strings":["b","c"]}"#).unwrap();

    let comparison = lhs.compare(&rhs).unwrap();

    let mut removed = path(vec!["strings"]);
    removed.push(PathElement::value(Value::String("a".into())));
    let mut added = path(vec!["strings"]);
    added.push(PathElement::value(Value::String("c".into())));

    assert!(comparison.removed.has(&removed));
    assert!(comparison.added.has(&added));
    assert!(comparison.modified.is_empty());
}

#[test]
fn test_symdiff_positional_by_index() {
    let parser = Parser::new(LIST_SCHEMA).unwrap();
    let pt = parser.type_by_name("lists");

    let lhs = pt.from_yaml(r#"{"positional":[1,2]}"#).unwrap();
    let rhs = pt.from_yaml(r#"{"positional":[1,3,4]}"#).unwrap();

    let comparison = lhs.compare(&rhs).unwrap();

    let mut idx1 = path(vec!["positional"]);
    idx1.push(PathElement::index(1));
    let mut idx2 = path(vec!["positional"]);
    idx2.push(PathElement::index(2));

    assert!(comparison.modified.has(&idx1));
    assert!(comparison.added.has(&idx2));
    assert!(comparison.removed.is_empty());
}

#[test]
fn test_symdiff_duplicate_keys_error() {
    let parser = Parser::new(LIST_SCHEMA).unwrap();
    let pt = parser.type_by_name("lists");

    let lhs = pt
        .from_yaml_with_opts(
            r#"{"keyed":[{"k":"a","v":1},{"k":"a","v":2}]}"#,
            &[crate::typed::ValidationOption::AllowDuplicates],
        )
        .unwrap();
    let rhs = pt.from_yaml(r#"{"keyed":[{"k":"a","v":1}]}"#).unwrap();

    let err = lhs.compare(&rhs).unwrap_err();
    assert!(format!("{}", err).contains("duplicate entries"), "{}", err);
}

#[test]
fn test_symdiff_anti_symmetry() {
    let parser = Parser::new(LIST_SCHEMA).unwrap();
    let pt = parser.type_by_name("lists");

    let lhs = pt
        .from_yaml(r#"{"keyed":[{"k":"a","v":1}],"strings":["x"]}"#)
        .unwrap();
    let rhs = pt
        .from_yaml(r#"{"keyed":[{"k":"a","v":2},{"k":"b"}],"strings":[]}"#)
        .unwrap();

    let forward = lhs.compare(&rhs).unwrap();
    let backward = rhs.compare(&lhs).unwrap();

    assert!(forward.added.equals(&backward.removed));
    assert!(forward.removed.equals(&backward.added));
    assert!(forward.modified.equals(&backward.modified));
}

#[test]
fn test_symdiff_identity_over_shapes() {
    let parser = Parser::new(LIST_SCHEMA).unwrap();
    let pt = parser.type_by_name("lists");

    for doc in [
        r#"{}"#,
        r#"{"keyed":[]}"#,
        r#"{"keyed":[{"k":"a","v":1}],"strings":["a","b"],"positional":[1,2,3]}"#,
    ] {
        let v = pt.from_yaml(doc).unwrap();
        let comparison = v.compare(&v).unwrap();
        assert!(comparison.is_same(), "{} produced {}", doc, comparison);
    }
}
