#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use docgate_core::audit::{AuditOutcome, AuditRecord, AuditSink};
use docgate_core::error::DenialReason;
use docgate_core::policy::{Document, DoctypePolicy, Operation, PolicyStore};
use docgate_gateway::policy::{OperationGrant, PolicyEngine};
use serde_json::json;

#[derive(Default)]
struct CapturingSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl AuditSink for CapturingSink {
    fn record(&self, record: &AuditRecord) -> docgate_core::error::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Sink that always fails, to prove decisions survive it.
struct BrokenSink;

impl AuditSink for BrokenSink {
    fn record(&self, _record: &AuditRecord) -> docgate_core::error::Result<()> {
        Err(docgate_core::error::DocGateError::Internal(
            "sink unavailable".into(),
        ))
    }
}

fn engine_with(yaml: &str) -> (PolicyEngine, Arc<CapturingSink>) {
    let policies: BTreeMap<String, DoctypePolicy> = serde_yaml::from_str(yaml).unwrap();
    let store = Arc::new(PolicyStore::new(policies).unwrap());
    let sink = Arc::new(CapturingSink::default());
    (PolicyEngine::new(store, sink.clone()), sink)
}

fn doc(value: serde_json::Value) -> Document {
    value.as_object().unwrap().clone()
}

const CUSTOMER: &str = r#"
Customer:
  operations: { read: true, create: true }
  allowed_fields: [customer_name, email_id]
"#;

#[test]
fn unknown_doctype_denies_every_operation() {
    let (engine, _) = engine_with(CUSTOMER);
    for op in Operation::ALL {
        let err = engine
            .validate_operation("tester", op, "Supplier", None, None)
            .unwrap_err();
        assert_eq!(err, DenialReason::UnknownDoctype("Supplier".into()));
        assert!(!engine.can_perform("Supplier", op));
    }
}

#[test]
fn delete_without_flag_is_operation_not_permitted() {
    let (engine, _) = engine_with(CUSTOMER);
    let err = engine
        .validate_operation("tester", Operation::Delete, "Customer", None, Some("CUST-1"))
        .unwrap_err();
    assert_eq!(
        err,
        DenialReason::OperationNotPermitted {
            doctype: "Customer".into(),
            operation: Operation::Delete,
        }
    );
}

#[test]
fn create_strips_unlisted_fields_silently() {
    let (engine, _) = engine_with(CUSTOMER);
    let payload = doc(json!({"customer_name": "X", "credit_limit": 500}));
    let grant = engine
        .validate_operation("tester", Operation::Create, "Customer", Some(&payload), None)
        .unwrap();

    let OperationGrant::Write(write) = grant else {
        panic!("expected write grant");
    };
    assert_eq!(write.payload, doc(json!({"customer_name": "X"})));
    assert_eq!(write.accepted_fields, vec!["customer_name".to_string()]);
}

#[test]
fn not_in_condition_denies_matching_value() {
    let (engine, _) = engine_with(
        r#"
Customer:
  operations: { update: true }
  conditions:
    update:
      status: { not_in: [Disabled] }
"#,
    );
    let err = engine
        .validate_operation(
            "tester",
            Operation::Update,
            "Customer",
            Some(&doc(json!({"status": "Disabled"}))),
            Some("CUST-1"),
        )
        .unwrap_err();
    match err {
        DenialReason::ConditionNotMet { field, .. } => assert_eq!(field, "status"),
        other => panic!("unexpected denial: {other:?}"),
    }
}

#[test]
fn conditions_run_on_pre_sanitization_payload() {
    // "status" is restricted: sanitation strips it, yet the condition
    // must still see the submitted value. Omission is not a bypass.
    let yaml = r#"
Customer:
  operations: { update: true }
  allowed_fields: [customer_name]
  restricted_fields: [status]
  conditions:
    update:
      status: { not_in: [Disabled] }
"#;
    let (engine, _) = engine_with(yaml);

    let err = engine
        .validate_operation(
            "tester",
            Operation::Update,
            "Customer",
            Some(&doc(json!({"customer_name": "X", "status": "Disabled"}))),
            Some("CUST-1"),
        )
        .unwrap_err();
    assert!(matches!(err, DenialReason::ConditionNotMet { .. }));

    // With an acceptable value the write passes, and the restricted
    // field never reaches the sanitized payload.
    let (engine, _) = engine_with(yaml);
    let grant = engine
        .validate_operation(
            "tester",
            Operation::Update,
            "Customer",
            Some(&doc(json!({"customer_name": "X", "status": "Active"}))),
            Some("CUST-1"),
        )
        .unwrap();
    let OperationGrant::Write(write) = grant else {
        panic!("expected write grant");
    };
    assert_eq!(write.payload, doc(json!({"customer_name": "X"})));
}

#[test]
fn fully_stripped_payload_is_denied() {
    let (engine, _) = engine_with(CUSTOMER);
    let err = engine
        .validate_operation(
            "tester",
            Operation::Create,
            "Customer",
            Some(&doc(json!({"credit_limit": 500}))),
            None,
        )
        .unwrap_err();
    assert_eq!(err, DenialReason::NoFieldsRemainAfterFiltering);
}

#[test]
fn every_decision_audits_exactly_once() {
    let (engine, sink) = engine_with(CUSTOMER);

    engine
        .validate_operation("alice", Operation::Read, "Customer", None, None)
        .unwrap();
    engine
        .validate_operation("alice", Operation::Delete, "Customer", None, Some("CUST-1"))
        .unwrap_err();

    let records = sink.records.lock().unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].outcome, AuditOutcome::Allowed);
    assert_eq!(records[0].identity, "alice");
    assert_eq!(
        records[0].fields,
        vec!["customer_name".to_string(), "email_id".to_string()]
    );

    assert_eq!(records[1].outcome, AuditOutcome::Denied);
    assert_eq!(records[1].document_id.as_deref(), Some("CUST-1"));
    // Field names only, never values.
    assert!(records[1].fields.is_empty());
}

#[test]
fn failing_sink_does_not_fail_the_decision() {
    let policies: BTreeMap<String, DoctypePolicy> = serde_yaml::from_str(CUSTOMER).unwrap();
    let store = Arc::new(PolicyStore::new(policies).unwrap());
    let engine = PolicyEngine::new(store, Arc::new(BrokenSink));

    let grant = engine.validate_operation("tester", Operation::Read, "Customer", None, None);
    assert!(grant.is_ok());
}

#[test]
fn describe_policy_reports_effective_fields() {
    let (engine, _) = engine_with(
        r#"
Customer:
  operations: { read: true, create: true }
  allowed_fields: [customer_name, email_id]
  restricted_fields: [email_id]
"#,
    );
    let summary = engine.describe_policy("Customer").unwrap();
    assert_eq!(summary.operations, vec![Operation::Read, Operation::Create]);
    assert_eq!(
        summary.allowed_fields,
        Some(vec!["customer_name".to_string()])
    );
    assert!(engine.describe_policy("Supplier").is_none());
}
