use std::sync::Arc;

use serde::Serialize;

use docgate_core::audit::{AuditRecord, AuditSink};
use docgate_core::error::DenialReason;
use docgate_core::policy::{Conditions, Document, FieldAccess, Operation, PolicyStore};

/// Outcome of a granted `validate_operation` call.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationGrant {
    /// Read permitted; apply this visibility to every returned document.
    Read { field_access: FieldAccess },
    /// Create/update permitted with the sanitized payload.
    Write(SanitizedWrite),
    /// Delete permitted (no payload to sanitize).
    Delete,
}

/// A write payload after field sanitation.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedWrite {
    pub payload: Document,
    /// Names of the fields actually accepted, in payload order.
    pub accepted_fields: Vec<String>,
}

/// Introspection summary for one doctype.
#[derive(Debug, Clone, Serialize)]
pub struct DoctypeSummary {
    pub doctype: String,
    pub operations: Vec<Operation>,
    /// Effective allow-list (restricted fields removed), or `None`
    /// when all non-restricted fields are visible.
    pub allowed_fields: Option<Vec<String>>,
    pub restricted_fields: Vec<String>,
    pub conditions: Conditions,
}

/// Policy evaluation engine.
///
/// Owns an immutable policy store and an injected audit sink; holds no
/// other state, so concurrent use needs no locking. Construct once at
/// startup, then share via `Arc`.
pub struct PolicyEngine {
    store: Arc<PolicyStore>,
    sink: Arc<dyn AuditSink>,
}

impl PolicyEngine {
    pub fn new(store: Arc<PolicyStore>, sink: Arc<dyn AuditSink>) -> Self {
        Self { store, sink }
    }

    /// True iff the store has an entry and its operation flag is set.
    /// No side effects, no audit.
    pub fn can_perform(&self, doctype: &str, op: Operation) -> bool {
        self.store
            .get(doctype)
            .map(|p| p.operations.allows(op))
            .unwrap_or(false)
    }

    /// Field visibility for a doctype, `None` for unknown doctypes.
    pub fn allowed_fields(&self, doctype: &str) -> Option<FieldAccess> {
        self.store.get(doctype).map(|p| p.field_access())
    }

    /// Field-restricted view of a fetched document. Pure; the read
    /// decision (and its audit record) happens in `validate_operation`.
    /// An unknown doctype yields an empty view: the grant check has
    /// already rejected it, and absence must never widen visibility.
    pub fn filter_read(&self, doctype: &str, doc: &Document) -> Document {
        match self.store.get(doctype) {
            Some(policy) => policy.filter_fields(doc),
            None => Document::new(),
        }
    }

    /// Configured doctype names in stable order.
    pub fn list_doctypes(&self) -> Vec<String> {
        self.store.doctypes().map(str::to_string).collect()
    }

    /// Introspection: the effective policy for one doctype.
    pub fn describe_policy(&self, doctype: &str) -> Option<DoctypeSummary> {
        let policy = self.store.get(doctype)?;
        let operations = Operation::ALL
            .into_iter()
            .filter(|op| policy.operations.allows(*op))
            .collect();
        let allowed_fields = match policy.field_access() {
            FieldAccess::All => None,
            FieldAccess::Only(fields) => Some(fields),
        };
        Some(DoctypeSummary {
            doctype: doctype.to_string(),
            operations,
            allowed_fields,
            restricted_fields: policy.restricted_fields.clone(),
            conditions: policy.conditions.clone(),
        })
    }

    /// Single entry point for the orchestrator: decide one operation,
    /// emit exactly one audit record, and return either a grant or a
    /// typed denial.
    ///
    /// For writes the order is deliberate and security-relevant:
    /// operation flag first (fail fast), then conditions evaluated
    /// against the ORIGINAL payload, then field sanitation. Sanitizing
    /// first would let a caller bypass a condition on a restricted
    /// field by having it stripped.
    pub fn validate_operation(
        &self,
        identity: &str,
        op: Operation,
        doctype: &str,
        payload: Option<&Document>,
        document_id: Option<&str>,
    ) -> Result<OperationGrant, DenialReason> {
        let decision = self.decide(op, doctype, payload);

        match &decision {
            Ok(grant) => {
                let fields = match grant {
                    OperationGrant::Read { field_access } => match field_access {
                        FieldAccess::All => Vec::new(),
                        FieldAccess::Only(fields) => fields.clone(),
                    },
                    OperationGrant::Write(write) => write.accepted_fields.clone(),
                    OperationGrant::Delete => Vec::new(),
                };
                self.emit(AuditRecord::allowed(
                    identity,
                    op,
                    doctype,
                    document_id,
                    fields,
                ));
            }
            Err(reason) => {
                self.emit(AuditRecord::denied(
                    identity,
                    op,
                    doctype,
                    document_id,
                    reason,
                ));
            }
        }

        decision
    }

    /// Record a denial that happens after the policy grant (admission
    /// control). Keeps the audit trail complete: a request refused at
    /// the rate limiter must not end with an ALLOWED record.
    pub fn record_denial(
        &self,
        identity: &str,
        op: Operation,
        doctype: &str,
        document_id: Option<&str>,
        reason: &DenialReason,
    ) {
        self.emit(AuditRecord::denied(
            identity,
            op,
            doctype,
            document_id,
            reason,
        ));
    }

    fn decide(
        &self,
        op: Operation,
        doctype: &str,
        payload: Option<&Document>,
    ) -> Result<OperationGrant, DenialReason> {
        let Some(policy) = self.store.get(doctype) else {
            return Err(DenialReason::UnknownDoctype(doctype.to_string()));
        };

        if !policy.operations.allows(op) {
            return Err(DenialReason::OperationNotPermitted {
                doctype: doctype.to_string(),
                operation: op,
            });
        }

        if op == Operation::Read {
            return Ok(OperationGrant::Read {
                field_access: policy.field_access(),
            });
        }

        // Conditions gate candidate payloads; when none is supplied
        // (the usual delete shape) there is nothing to evaluate.
        if let (Some(conditions), Some(payload)) =
            (policy.conditions.for_operation(op), payload)
        {
            conditions.evaluate(payload)?;
        }

        if op == Operation::Delete {
            return Ok(OperationGrant::Delete);
        }

        let payload = payload.cloned().unwrap_or_default();
        let sanitized = policy.filter_fields(&payload);
        if sanitized.is_empty() {
            return Err(DenialReason::NoFieldsRemainAfterFiltering);
        }
        let accepted_fields = sanitized.keys().cloned().collect();

        Ok(OperationGrant::Write(SanitizedWrite {
            payload: sanitized,
            accepted_fields,
        }))
    }

    fn emit(&self, record: AuditRecord) {
        // A failing sink must never fail the decision it records.
        if let Err(e) = self.sink.record(&record) {
            tracing::error!(error = %e, "audit sink failure; record dropped");
        }
    }
}
