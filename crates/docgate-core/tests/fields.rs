#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::BTreeMap;

use docgate_core::policy::{Document, DoctypePolicy, FieldAccess, Operation, PolicyStore};
use serde_json::json;

fn doc(value: serde_json::Value) -> Document {
    value.as_object().unwrap().clone()
}

fn policy(yaml: &str) -> DoctypePolicy {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn allow_list_strips_unlisted_fields() {
    let p = policy(
        r#"
operations: { read: true }
allowed_fields: [customer_name, email_id]
"#,
    );
    let filtered = p.filter_fields(&doc(json!({
        "customer_name": "X",
        "email_id": "x@example.com",
        "credit_limit": 500,
    })));
    assert_eq!(
        filtered,
        doc(json!({"customer_name": "X", "email_id": "x@example.com"}))
    );
}

#[test]
fn restricted_always_wins_over_allow_list() {
    let p = policy(
        r#"
operations: { read: true }
allowed_fields: [customer_name, email_id]
restricted_fields: [email_id]
"#,
    );
    assert!(!p.field_allowed("email_id"));
    let filtered = p.filter_fields(&doc(json!({
        "customer_name": "X",
        "email_id": "x@example.com",
    })));
    assert_eq!(filtered, doc(json!({"customer_name": "X"})));

    // The effective visibility reported to callers excludes it too.
    assert_eq!(
        p.field_access(),
        FieldAccess::Only(vec!["customer_name".to_string()])
    );
}

#[test]
fn no_allow_list_only_strips_restricted() {
    let p = policy(
        r#"
operations: { read: true }
restricted_fields: [tax_id]
"#,
    );
    let filtered = p.filter_fields(&doc(json!({"a": 1, "tax_id": "x"})));
    assert_eq!(filtered, doc(json!({"a": 1})));
    assert_eq!(p.field_access(), FieldAccess::All);
}

#[test]
fn filtering_is_idempotent_and_does_not_mutate_input() {
    let p = policy(
        r#"
operations: { read: true }
allowed_fields: [a, b]
restricted_fields: [b]
"#,
    );
    let input = doc(json!({"a": 1, "b": 2, "c": 3}));
    let once = p.filter_fields(&input);
    let twice = p.filter_fields(&once);
    assert_eq!(once, twice);
    assert_eq!(input.len(), 3);
}

#[test]
fn operation_flags_default_deny() {
    let p = policy("operations: { read: true }");
    assert!(p.operations.allows(Operation::Read));
    assert!(!p.operations.allows(Operation::Create));
    assert!(!p.operations.allows(Operation::Update));
    assert!(!p.operations.allows(Operation::Delete));
}

#[test]
fn unknown_operation_flag_is_a_parse_error() {
    assert!(serde_yaml::from_str::<DoctypePolicy>("operations: { export: true }").is_err());
}

#[test]
fn store_lookup_is_exact_and_ordered() {
    let mut map = BTreeMap::new();
    map.insert("Item".to_string(), policy("operations: { read: true }"));
    map.insert("Customer".to_string(), policy("operations: { read: true }"));
    let store = PolicyStore::new(map).unwrap();

    assert!(store.get("Customer").is_some());
    assert!(store.get("customer").is_none());
    let names: Vec<&str> = store.doctypes().collect();
    assert_eq!(names, vec!["Customer", "Item"]);
}

#[test]
fn empty_doctype_name_is_a_config_error() {
    let mut map = BTreeMap::new();
    map.insert("  ".to_string(), DoctypePolicy::default());
    assert!(PolicyStore::new(map).is_err());
}

#[test]
fn doctype_name_with_key_separator_is_a_config_error() {
    // "A|B" would alias "A"'s derived keys and get swept by its
    // invalidation.
    let mut map = BTreeMap::new();
    map.insert("A|B".to_string(), policy("operations: { read: true }"));
    let err = PolicyStore::new(map).unwrap_err();
    assert!(err.to_string().contains('|'));
}
