//! Shared error and denial types across docgate crates.
//!
//! A denial is not a fault: it is the normal, typed outcome of policy
//! or admission-control evaluation and travels through `Result` values
//! without unwinding. `DocGateError` covers everything else (fatal
//! configuration problems at startup, backend transport failures, and
//! should-never-happen invariant violations).

use thiserror::Error;

use crate::policy::{Operation, Predicate};

/// Shared result type for fallible (non-denial) operations.
pub type Result<T> = std::result::Result<T, DocGateError>;

/// Why a request was refused. Expected, per-request, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DenialReason {
    /// Doctype has no policy entry. Absence is not permission.
    #[error("doctype '{0}' is not configured")]
    UnknownDoctype(String),
    /// The per-doctype operation flag is false or absent.
    #[error("operation '{operation}' not allowed for doctype '{doctype}'")]
    OperationNotPermitted {
        doctype: String,
        operation: Operation,
    },
    /// A write condition failed. Reports the first failing field in
    /// declaration order, together with the predicate it failed.
    #[error("field '{field}' failed condition: {predicate}")]
    ConditionNotMet { field: String, predicate: Predicate },
    /// Sanitation stripped every field from a write payload.
    #[error("no fields remain after filtering")]
    NoFieldsRemainAfterFiltering,
    /// A rate budget (per-minute or per-hour) is exhausted.
    #[error("rate limit exceeded")]
    RateLimited,
}

impl DenialReason {
    /// Stable client-facing code string (API surface, do not rename).
    pub fn client_code(&self) -> &'static str {
        match self {
            DenialReason::UnknownDoctype(_) => "UNKNOWN_DOCTYPE",
            DenialReason::OperationNotPermitted { .. } => "OPERATION_NOT_PERMITTED",
            DenialReason::ConditionNotMet { .. } => "CONDITION_NOT_MET",
            DenialReason::NoFieldsRemainAfterFiltering => "NO_FIELDS_REMAIN",
            DenialReason::RateLimited => "RATE_LIMITED",
        }
    }
}

/// Unified fault type used by core and gateway.
#[derive(Debug, Error)]
pub enum DocGateError {
    /// Malformed configuration. Fatal, detected at startup only.
    #[error("config error: {0}")]
    Config(String),
    /// Backend transport failure (HTTP error, decode failure, timeout).
    #[error("backend error: {0}")]
    Backend(String),
    /// Internal failure that is not a policy outcome.
    #[error("internal: {0}")]
    Internal(String),
    /// Programming defect: the policy itself is broken, not the caller.
    /// Surfaced distinctly from denials so operators can tell them apart.
    #[error("invariant violation: {0}")]
    Invariant(String),
}
