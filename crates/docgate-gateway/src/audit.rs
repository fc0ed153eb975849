//! Audit sinks.
//!
//! The default sink writes structured records to `tracing` under the
//! `audit` target: info for grants, warn for denials. Persistence and
//! rotation are the subscriber's concern, not the gateway's.

use docgate_core::audit::{AuditOutcome, AuditRecord, AuditSink};
use docgate_core::error::{DocGateError, Result};

/// Sink emitting audit records as structured tracing events.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        let fields = serde_json::to_string(&record.fields)
            .map_err(|e| DocGateError::Internal(format!("serialize audit fields: {e}")))?;

        match record.outcome {
            AuditOutcome::Allowed => tracing::info!(
                target: "audit",
                identity = %record.identity,
                operation = %record.operation,
                doctype = %record.doctype,
                document_id = record.document_id.as_deref().unwrap_or("-"),
                result = "ALLOWED",
                %fields,
                "{}", record.reason
            ),
            AuditOutcome::Denied => tracing::warn!(
                target: "audit",
                identity = %record.identity,
                operation = %record.operation,
                doctype = %record.doctype,
                document_id = record.document_id.as_deref().unwrap_or("-"),
                result = "DENIED",
                %fields,
                "{}", record.reason
            ),
        }
        Ok(())
    }
}

/// Sink used when auditing is disabled in config.
#[derive(Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }
}
