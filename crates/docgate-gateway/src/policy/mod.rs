//! Policy layer: the evaluation engine over the immutable policy store.
//!
//! Turns the declarative per-doctype configuration into allow/deny
//! decisions, sanitized write payloads, and audit records for the
//! orchestrator to consume at runtime.

pub mod engine;

pub use engine::{DoctypeSummary, OperationGrant, PolicyEngine, SanitizedWrite};
