//! Backend transport seam.
//!
//! The gateway core never issues network calls itself; it talks to the
//! document API through this trait. Retry/backoff is deliberately not
//! implemented here.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use docgate_core::error::Result;
use docgate_core::policy::Document;

pub use http::HttpBackend;

/// Normalized list/search parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Backend filter expression (opaque JSON, forwarded as-is).
    pub filters: Option<Value>,
    /// Specific fields to request from the backend.
    pub fields: Option<Vec<String>>,
    pub limit: usize,
    pub offset: usize,
}

/// Remote document-API client.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn get_doc(&self, doctype: &str, name: &str) -> Result<Document>;
    async fn list_docs(&self, doctype: &str, query: &ListQuery) -> Result<Vec<Document>>;
    async fn create_doc(&self, doctype: &str, payload: &Document) -> Result<Document>;
    async fn update_doc(&self, doctype: &str, name: &str, payload: &Document) -> Result<Document>;
    async fn delete_doc(&self, doctype: &str, name: &str) -> Result<()>;
    /// Schema/metadata for a doctype, as the backend reports it.
    async fn get_doctype_meta(&self, doctype: &str) -> Result<Document>;
    /// Backend version/installation details.
    async fn get_system_info(&self) -> Result<Value>;
    /// Liveness probe against the backend.
    async fn ping(&self) -> Result<bool>;
}
