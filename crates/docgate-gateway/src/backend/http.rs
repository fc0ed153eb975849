//! HTTP implementation of the backend seam (Frappe-style REST API).
//!
//! Documents live under `/api/resource/{doctype}[/{name}]`; responses
//! wrap the payload in a `data` envelope. Auth is a static token pair
//! sent on every request.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

use docgate_core::error::{DocGateError, Result};
use docgate_core::policy::Document;

use crate::config::BackendSection;

use super::{DocumentBackend, ListQuery};

pub struct HttpBackend {
    base: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(cfg: &BackendSection) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let token = format!("token {}:{}", cfg.api_key, cfg.api_secret);
        let mut auth = HeaderValue::from_str(&token)
            .map_err(|e| DocGateError::Config(format!("invalid backend credentials: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| DocGateError::Config(format!("build http client: {e}")))?;

        Ok(Self {
            base: cfg.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn resource_url(&self, doctype: &str, name: Option<&str>) -> String {
        match name {
            Some(n) => format!("{}/api/resource/{}/{}", self.base, doctype, n),
            None => format!("{}/api/resource/{}", self.base, doctype),
        }
    }

    async fn read_data(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DocGateError::Backend(format!("http {status}: {body}")));
        }
        let mut envelope: Value = resp
            .json()
            .await
            .map_err(|e| DocGateError::Backend(format!("decode response: {e}")))?;
        // Resource routes wrap the payload in `data`, method routes in
        // `message`.
        Ok(envelope
            .get_mut("data")
            .map(Value::take)
            .or_else(|| envelope.get_mut("message").map(Value::take))
            .unwrap_or(envelope))
    }

    fn as_document(value: Value) -> Result<Document> {
        match value {
            Value::Object(map) => Ok(map),
            other => Err(DocGateError::Backend(format!(
                "expected document object, got: {other}"
            ))),
        }
    }
}

#[async_trait]
impl DocumentBackend for HttpBackend {
    async fn get_doc(&self, doctype: &str, name: &str) -> Result<Document> {
        let resp = self
            .client
            .get(self.resource_url(doctype, Some(name)))
            .send()
            .await
            .map_err(|e| DocGateError::Backend(format!("get {doctype}/{name}: {e}")))?;
        Self::as_document(Self::read_data(resp).await?)
    }

    async fn list_docs(&self, doctype: &str, query: &ListQuery) -> Result<Vec<Document>> {
        let mut params: Vec<(&str, String)> = vec![
            ("limit_page_length", query.limit.to_string()),
            ("limit_start", query.offset.to_string()),
        ];
        if let Some(filters) = &query.filters {
            params.push(("filters", filters.to_string()));
        }
        if let Some(fields) = &query.fields {
            let fields = serde_json::to_string(fields)
                .map_err(|e| DocGateError::Internal(format!("encode fields: {e}")))?;
            params.push(("fields", fields));
        }

        let resp = self
            .client
            .get(self.resource_url(doctype, None))
            .query(&params)
            .send()
            .await
            .map_err(|e| DocGateError::Backend(format!("list {doctype}: {e}")))?;

        match Self::read_data(resp).await? {
            Value::Array(items) => items.into_iter().map(Self::as_document).collect(),
            other => Err(DocGateError::Backend(format!(
                "expected document list, got: {other}"
            ))),
        }
    }

    async fn create_doc(&self, doctype: &str, payload: &Document) -> Result<Document> {
        let resp = self
            .client
            .post(self.resource_url(doctype, None))
            .json(payload)
            .send()
            .await
            .map_err(|e| DocGateError::Backend(format!("create {doctype}: {e}")))?;
        Self::as_document(Self::read_data(resp).await?)
    }

    async fn update_doc(&self, doctype: &str, name: &str, payload: &Document) -> Result<Document> {
        let resp = self
            .client
            .put(self.resource_url(doctype, Some(name)))
            .json(payload)
            .send()
            .await
            .map_err(|e| DocGateError::Backend(format!("update {doctype}/{name}: {e}")))?;
        Self::as_document(Self::read_data(resp).await?)
    }

    async fn delete_doc(&self, doctype: &str, name: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.resource_url(doctype, Some(name)))
            .send()
            .await
            .map_err(|e| DocGateError::Backend(format!("delete {doctype}/{name}: {e}")))?;
        Self::read_data(resp).await.map(|_| ())
    }

    async fn get_doctype_meta(&self, doctype: &str) -> Result<Document> {
        // Schemas are themselves documents under the DocType resource.
        let resp = self
            .client
            .get(self.resource_url("DocType", Some(doctype)))
            .send()
            .await
            .map_err(|e| DocGateError::Backend(format!("meta {doctype}: {e}")))?;
        Self::as_document(Self::read_data(resp).await?)
    }

    async fn get_system_info(&self) -> Result<Value> {
        let url = format!("{}/api/method/frappe.utils.get_system_info", self.base);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DocGateError::Backend(format!("system info: {e}")))?;
        Self::read_data(resp).await
    }

    async fn ping(&self) -> Result<bool> {
        let url = format!("{}/api/method/ping", self.base);
        match self.client.get(url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}
