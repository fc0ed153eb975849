//! docgate core: policy data model, condition evaluation, field
//! filtering, and the denial/error taxonomy shared across crates.
//!
//! This crate defines the access-control contracts consumed by the
//! gateway. It intentionally carries no transport or runtime
//! dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `DocGateError`/`DenialReason` so
//! a malformed payload or policy lookup can never crash the gateway.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod audit;
pub mod error;
pub mod policy;

pub use audit::{AuditOutcome, AuditRecord, AuditSink};
pub use error::{DenialReason, DocGateError, Result};
pub use policy::{
    ConditionSet, Document, DoctypePolicy, FieldAccess, Operation, PolicyStore, Predicate,
};
