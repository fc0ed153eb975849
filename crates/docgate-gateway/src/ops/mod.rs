//! Request orchestrator.
//!
//! Sequences every operation the same way: policy decision first, then
//! rate-limit admission, then cache/backend for reads or backend plus
//! cache invalidation for writes. The cache lock is never held across
//! a backend call, and policy denials and rate-limit denials travel in
//! the same result shape so callers handle both uniformly.

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;

use docgate_core::error::{DenialReason, DocGateError};
use docgate_core::policy::{Document, FieldAccess, Operation};

use crate::backend::{DocumentBackend, ListQuery};
use crate::cache::{cache_key, TtlCache};
use crate::config::RateScope;
use crate::policy::{DoctypeSummary, OperationGrant, PolicyEngine};
use crate::ratelimit::RateLimiter;

/// Per-request outcome: an expected denial or an infrastructure fault.
#[derive(Debug, Error)]
pub enum OpError {
    #[error(transparent)]
    Denied(#[from] DenialReason),
    #[error(transparent)]
    Failed(#[from] DocGateError),
}

pub type OpResult<T> = std::result::Result<T, OpError>;

const GLOBAL_SCOPE: &str = "global";

pub struct Orchestrator {
    engine: Arc<PolicyEngine>,
    backend: Arc<dyn DocumentBackend>,
    cache: Option<Arc<TtlCache>>,
    limiter: Option<Arc<RateLimiter>>,
    rate_scope: RateScope,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<PolicyEngine>,
        backend: Arc<dyn DocumentBackend>,
        cache: Option<Arc<TtlCache>>,
        limiter: Option<Arc<RateLimiter>>,
        rate_scope: RateScope,
    ) -> Self {
        Self {
            engine,
            backend,
            cache,
            limiter,
            rate_scope,
        }
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub async fn get_document(
        &self,
        identity: &str,
        doctype: &str,
        name: &str,
    ) -> OpResult<Document> {
        self.engine
            .validate_operation(identity, Operation::Read, doctype, None, Some(name))?;
        self.admit(identity, Operation::Read, doctype, Some(name))?;

        let key = cache_key(doctype, Operation::Read, &json!({ "name": name }));
        if let Some(hit) = self.cache_get(&key) {
            if let Value::Object(doc) = hit {
                return Ok(doc);
            }
        }

        let doc = self.backend.get_doc(doctype, name).await?;
        let filtered = self.engine.filter_read(doctype, &doc);
        self.cache_put(key, Value::Object(filtered.clone()));
        Ok(filtered)
    }

    pub async fn list_documents(
        &self,
        identity: &str,
        doctype: &str,
        query: ListQuery,
    ) -> OpResult<Vec<Document>> {
        let grant = self.engine.validate_operation(
            identity,
            Operation::Read,
            doctype,
            None,
            None,
        )?;
        self.admit(identity, Operation::Read, doctype, None)?;

        let query = match grant {
            OperationGrant::Read { field_access } => narrow_query(query, &field_access),
            _ => query,
        };

        let key = cache_key(
            doctype,
            Operation::Read,
            &json!({
                "filters": query.filters,
                "fields": query.fields,
                "limit": query.limit,
                "offset": query.offset,
            }),
        );
        if let Some(Value::Array(hit)) = self.cache_get(&key) {
            return Ok(docs_from_values(hit));
        }

        let docs = self.backend.list_docs(doctype, &query).await?;
        let filtered: Vec<Document> = docs
            .iter()
            .map(|d| self.engine.filter_read(doctype, d))
            .collect();

        let cached: Vec<Value> = filtered.iter().cloned().map(Value::Object).collect();
        self.cache_put(key, Value::Array(cached));
        Ok(filtered)
    }

    /// Name-substring search, expressed as a filtered list read so it
    /// shares the cache and policy path.
    pub async fn search_documents(
        &self,
        identity: &str,
        doctype: &str,
        term: &str,
        limit: usize,
    ) -> OpResult<Vec<Document>> {
        let query = ListQuery {
            filters: Some(json!([["name", "like", format!("%{term}%")]])),
            fields: None,
            limit,
            offset: 0,
        };
        self.list_documents(identity, doctype, query).await
    }

    pub async fn create_document(
        &self,
        identity: &str,
        doctype: &str,
        payload: Document,
    ) -> OpResult<Document> {
        let grant = self.engine.validate_operation(
            identity,
            Operation::Create,
            doctype,
            Some(&payload),
            None,
        )?;
        self.write_through(identity, doctype, None, grant, Operation::Create)
            .await
    }

    pub async fn update_document(
        &self,
        identity: &str,
        doctype: &str,
        name: &str,
        payload: Document,
    ) -> OpResult<Document> {
        let grant = self.engine.validate_operation(
            identity,
            Operation::Update,
            doctype,
            Some(&payload),
            Some(name),
        )?;
        self.write_through(identity, doctype, Some(name), grant, Operation::Update)
            .await
    }

    pub async fn delete_document(
        &self,
        identity: &str,
        doctype: &str,
        name: &str,
    ) -> OpResult<()> {
        self.engine
            .validate_operation(identity, Operation::Delete, doctype, None, Some(name))?;
        self.admit(identity, Operation::Delete, doctype, Some(name))?;

        self.backend.delete_doc(doctype, name).await?;
        self.invalidate(doctype);
        Ok(())
    }

    pub fn list_doctypes(&self) -> Vec<String> {
        self.engine.list_doctypes()
    }

    pub fn describe_policy(&self, doctype: &str) -> Option<DoctypeSummary> {
        self.engine.describe_policy(doctype)
    }

    /// Schema/metadata for a configured doctype. Gated like a read:
    /// an unconfigured doctype's schema is not disclosed.
    pub async fn get_doctype_schema(
        &self,
        identity: &str,
        doctype: &str,
    ) -> OpResult<Document> {
        self.engine
            .validate_operation(identity, Operation::Read, doctype, None, None)?;
        self.admit(identity, Operation::Read, doctype, None)?;

        let key = cache_key(doctype, Operation::Read, &json!({ "schema": true }));
        if let Some(Value::Object(hit)) = self.cache_get(&key) {
            return Ok(hit);
        }

        let meta = self.backend.get_doctype_meta(doctype).await?;
        self.cache_put(key, Value::Object(meta.clone()));
        Ok(meta)
    }

    /// Backend installation details. Like `ping_backend`, this is a
    /// plain passthrough with no doctype to gate.
    pub async fn system_info(&self) -> OpResult<Value> {
        Ok(self.backend.get_system_info().await?)
    }

    pub async fn ping_backend(&self) -> OpResult<bool> {
        Ok(self.backend.ping().await?)
    }

    async fn write_through(
        &self,
        identity: &str,
        doctype: &str,
        name: Option<&str>,
        grant: OperationGrant,
        op: Operation,
    ) -> OpResult<Document> {
        let OperationGrant::Write(sanitized) = grant else {
            return Err(DocGateError::Invariant(format!(
                "{op} grant without sanitized payload for {doctype}"
            ))
            .into());
        };
        self.admit(identity, op, doctype, name)?;

        let result = match name {
            None => self.backend.create_doc(doctype, &sanitized.payload).await?,
            Some(n) => {
                self.backend
                    .update_doc(doctype, n, &sanitized.payload)
                    .await?
            }
        };

        // A read immediately after this write must not observe the
        // pre-write cached value.
        self.invalidate(doctype);

        // The backend echo is field-filtered like any other read.
        Ok(self.engine.filter_read(doctype, &result))
    }

    /// Rate-limit admission. A refusal here is a denial like any
    /// other and is audited, even though the policy grant preceding it
    /// already left an ALLOWED record for the decision itself.
    fn admit(
        &self,
        identity: &str,
        op: Operation,
        doctype: &str,
        document_id: Option<&str>,
    ) -> Result<(), DenialReason> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        let scope = match self.rate_scope {
            RateScope::Global => GLOBAL_SCOPE,
            RateScope::Identity => identity,
        };
        if limiter.try_acquire(scope) {
            Ok(())
        } else {
            let reason = DenialReason::RateLimited;
            self.engine
                .record_denial(identity, op, doctype, document_id, &reason);
            Err(reason)
        }
    }

    fn cache_get(&self, key: &str) -> Option<Value> {
        self.cache.as_ref()?.get(key)
    }

    fn cache_put(&self, key: String, value: Value) {
        if let Some(cache) = &self.cache {
            cache.put(key, value);
        }
    }

    fn invalidate(&self, doctype: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_doctype(doctype);
        }
    }
}

/// Narrow a caller's requested field list to what policy allows. With
/// an allow-list configured, an unqualified request asks the backend
/// for exactly the visible fields instead of everything.
fn narrow_query(mut query: ListQuery, access: &FieldAccess) -> ListQuery {
    match access {
        FieldAccess::All => query,
        FieldAccess::Only(visible) => {
            query.fields = Some(match query.fields.take() {
                Some(requested) => requested
                    .into_iter()
                    .filter(|f| visible.contains(f))
                    .collect(),
                None => visible.clone(),
            });
            query
        }
    }
}

fn docs_from_values(values: Vec<Value>) -> Vec<Document> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(doc) => Some(doc),
            _ => None,
        })
        .collect()
}
