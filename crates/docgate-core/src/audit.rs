//! Audit contract: one immutable record per access decision.
//!
//! Records carry field *names* only, never field values, so sensitive
//! payload data cannot leak into logs. The sink is an injected
//! capability; persistence and rotation live behind it, outside the
//! core.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{DenialReason, Result};
use crate::policy::Operation;

/// Decision outcome as recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditOutcome {
    Allowed,
    Denied,
}

/// Immutable audit record for one policy decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    /// Identity/session marker of the caller.
    pub identity: String,
    pub operation: Operation,
    pub doctype: String,
    /// Target document identifier, when the operation names one.
    pub document_id: Option<String>,
    pub outcome: AuditOutcome,
    pub reason: String,
    /// Field names actually exposed (read) or accepted (write).
    /// Names only, never values.
    pub fields: Vec<String>,
}

impl AuditRecord {
    pub fn allowed(
        identity: &str,
        operation: Operation,
        doctype: &str,
        document_id: Option<&str>,
        fields: Vec<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            identity: identity.to_string(),
            operation,
            doctype: doctype.to_string(),
            document_id: document_id.map(str::to_string),
            outcome: AuditOutcome::Allowed,
            reason: "operation allowed".to_string(),
            fields,
        }
    }

    pub fn denied(
        identity: &str,
        operation: Operation,
        doctype: &str,
        document_id: Option<&str>,
        reason: &DenialReason,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            identity: identity.to_string(),
            operation,
            doctype: doctype.to_string(),
            document_id: document_id.map(str::to_string),
            outcome: AuditOutcome::Denied,
            reason: reason.to_string(),
            fields: Vec::new(),
        }
    }
}

/// Narrow "accepts AuditRecord" capability.
///
/// A failing sink must not fail the decision it records: callers log
/// the sink error and continue.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> Result<()>;
}
