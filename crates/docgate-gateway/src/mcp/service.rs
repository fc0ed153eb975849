//! MCP method routing: `initialize`, `tools/list`, `tools/call`.
//!
//! Stateless per message, so it serves HTTP POST transport directly.
//! Policy and rate-limit denials surface as tool errors with their
//! stable client code, never as JSON-RPC faults; JSON-RPC errors are
//! reserved for malformed requests.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use docgate_core::policy::Document;

use crate::backend::ListQuery;
use crate::mcp::jsonrpc::{JsonRpcId, JsonRpcRequest, JsonRpcResponse};
use crate::mcp::tools::{build_catalog, ToolBinding, ToolCatalog};
use crate::ops::{OpError, Orchestrator};

pub const PROTOCOL_VERSION: &str = "2025-06-18";

const DEFAULT_LIST_LIMIT: usize = 20;
const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Outcome of one tool call: rendered text plus an error flag.
struct ToolOutcome {
    text: String,
    is_error: bool,
}

impl ToolOutcome {
    fn ok(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    fn fail(text: String) -> Self {
        Self {
            text,
            is_error: true,
        }
    }
}

pub struct McpService {
    orchestrator: Arc<Orchestrator>,
    catalog: ToolCatalog,
}

impl McpService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let catalog = build_catalog(orchestrator.engine());
        Self {
            orchestrator,
            catalog,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Handle one JSON-RPC message. Returns `None` for notifications.
    pub async fn handle(&self, identity: &str, raw: Value) -> Option<Value> {
        let req: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(req) => req,
            Err(e) => {
                let resp = JsonRpcResponse::err(
                    JsonRpcId::Null,
                    crate::mcp::jsonrpc::CODE_INVALID_REQUEST,
                    format!("malformed request: {e}"),
                    None,
                );
                return serde_json::to_value(resp).ok();
            }
        };

        let Some(id) = req.id.clone() else {
            // Notification (e.g. notifications/initialized): no reply.
            return None;
        };

        let resp = if req.jsonrpc != crate::mcp::jsonrpc::JSONRPC_VERSION {
            JsonRpcResponse::err(
                id,
                crate::mcp::jsonrpc::CODE_INVALID_REQUEST,
                "jsonrpc version must be 2.0",
                None,
            )
        } else {
            self.dispatch(identity, id, &req).await
        };

        serde_json::to_value(resp).ok()
    }

    async fn dispatch(&self, identity: &str, id: JsonRpcId, req: &JsonRpcRequest) -> JsonRpcResponse {
        match req.method.as_str() {
            "initialize" => JsonRpcResponse::ok(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": {
                        "name": "docgate",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            "ping" => JsonRpcResponse::ok(id, json!({})),
            "tools/list" => JsonRpcResponse::ok(id, json!({ "tools": self.catalog.tools() })),
            "tools/call" => {
                let Some(params) = req.params.as_ref().and_then(Value::as_object) else {
                    return JsonRpcResponse::invalid_params(id, "params must be an object");
                };
                let Some(name) = params.get("name").and_then(Value::as_str) else {
                    return JsonRpcResponse::invalid_params(id, "missing tool name");
                };
                let args = params
                    .get("arguments")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();

                let outcome = self.call_tool(identity, name, &args).await;
                JsonRpcResponse::ok(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": outcome.text }],
                        "isError": outcome.is_error,
                    }),
                )
            }
            other => JsonRpcResponse::method_not_found(id, other),
        }
    }

    async fn call_tool(&self, identity: &str, name: &str, args: &Map<String, Value>) -> ToolOutcome {
        let Some(binding) = self.catalog.binding(name) else {
            return ToolOutcome::fail(format!("UNKNOWN_TOOL: no such tool: {name}"));
        };

        match binding.clone() {
            ToolBinding::ListDoctypes => {
                let summaries: Vec<Value> = self
                    .orchestrator
                    .list_doctypes()
                    .iter()
                    .filter_map(|d| self.orchestrator.describe_policy(d))
                    .filter_map(|s| serde_json::to_value(s).ok())
                    .collect();
                ToolOutcome::ok(render(&json!(summaries)))
            }
            ToolBinding::DescribePolicy => {
                let Some(doctype) = arg_str(args, "doctype") else {
                    return missing("doctype");
                };
                match self.orchestrator.describe_policy(&doctype) {
                    Some(summary) => ToolOutcome::ok(render(&json!(summary))),
                    None => ToolOutcome::fail(format!(
                        "UNKNOWN_DOCTYPE: doctype '{doctype}' is not configured"
                    )),
                }
            }
            ToolBinding::DoctypeSchema => {
                let Some(doctype) = arg_str(args, "doctype") else {
                    return missing("doctype");
                };
                match self
                    .orchestrator
                    .get_doctype_schema(identity, &doctype)
                    .await
                {
                    Ok(meta) => ToolOutcome::ok(format!(
                        "Schema for {doctype}:\n{}",
                        render(&Value::Object(meta))
                    )),
                    Err(e) => op_error(e),
                }
            }
            ToolBinding::SystemInfo => match self.orchestrator.system_info().await {
                Ok(info) => ToolOutcome::ok(render(&info)),
                Err(e) => op_error(e),
            },
            ToolBinding::PingBackend => match self.orchestrator.ping_backend().await {
                Ok(up) => ToolOutcome::ok(format!(
                    "backend is {}",
                    if up { "reachable" } else { "unreachable" }
                )),
                Err(e) => op_error(e),
            },
            ToolBinding::GetDoc { doctype } => {
                let Some(doctype) = doctype.or_else(|| arg_str(args, "doctype")) else {
                    return missing("doctype");
                };
                let Some(doc_name) = arg_str(args, "name") else {
                    return missing("name");
                };
                match self
                    .orchestrator
                    .get_document(identity, &doctype, &doc_name)
                    .await
                {
                    Ok(doc) => ToolOutcome::ok(render(&Value::Object(doc))),
                    Err(e) => op_error(e),
                }
            }
            ToolBinding::ListDocs { doctype } => {
                let Some(doctype) = doctype.or_else(|| arg_str(args, "doctype")) else {
                    return missing("doctype");
                };
                let query = ListQuery {
                    filters: args.get("filters").cloned(),
                    fields: arg_string_list(args, "fields"),
                    limit: arg_usize(args, "limit").unwrap_or(DEFAULT_LIST_LIMIT),
                    offset: arg_usize(args, "offset").unwrap_or(0),
                };
                match self
                    .orchestrator
                    .list_documents(identity, &doctype, query)
                    .await
                {
                    Ok(docs) => ToolOutcome::ok(render_docs(&doctype, docs)),
                    Err(e) => op_error(e),
                }
            }
            ToolBinding::SearchDocs { doctype } => {
                let Some(doctype) = doctype.or_else(|| arg_str(args, "doctype")) else {
                    return missing("doctype");
                };
                let Some(term) = arg_str(args, "search_term") else {
                    return missing("search_term");
                };
                let limit = arg_usize(args, "limit").unwrap_or(DEFAULT_SEARCH_LIMIT);
                match self
                    .orchestrator
                    .search_documents(identity, &doctype, &term, limit)
                    .await
                {
                    Ok(docs) => ToolOutcome::ok(render_docs(&doctype, docs)),
                    Err(e) => op_error(e),
                }
            }
            ToolBinding::CreateDoc { doctype } => {
                let Some(doctype) = doctype.or_else(|| arg_str(args, "doctype")) else {
                    return missing("doctype");
                };
                let Some(data) = arg_document(args, "data") else {
                    return missing("data");
                };
                match self
                    .orchestrator
                    .create_document(identity, &doctype, data)
                    .await
                {
                    Ok(doc) => ToolOutcome::ok(format!(
                        "{doctype} document created:\n{}",
                        render(&Value::Object(doc))
                    )),
                    Err(e) => op_error(e),
                }
            }
            ToolBinding::UpdateDoc { doctype } => {
                let Some(doctype) = doctype.or_else(|| arg_str(args, "doctype")) else {
                    return missing("doctype");
                };
                let Some(doc_name) = arg_str(args, "name") else {
                    return missing("name");
                };
                let Some(data) = arg_document(args, "data") else {
                    return missing("data");
                };
                match self
                    .orchestrator
                    .update_document(identity, &doctype, &doc_name, data)
                    .await
                {
                    Ok(doc) => ToolOutcome::ok(format!(
                        "{doctype} document '{doc_name}' updated:\n{}",
                        render(&Value::Object(doc))
                    )),
                    Err(e) => op_error(e),
                }
            }
            ToolBinding::DeleteDoc { doctype } => {
                let Some(doctype) = doctype.or_else(|| arg_str(args, "doctype")) else {
                    return missing("doctype");
                };
                let Some(doc_name) = arg_str(args, "name") else {
                    return missing("name");
                };
                if !args.get("confirm").and_then(Value::as_bool).unwrap_or(false) {
                    return ToolOutcome::fail(
                        "INVALID_ARGUMENTS: deletion requires confirm=true".to_string(),
                    );
                }
                match self
                    .orchestrator
                    .delete_document(identity, &doctype, &doc_name)
                    .await
                {
                    Ok(()) => {
                        ToolOutcome::ok(format!("{doctype} document '{doc_name}' deleted"))
                    }
                    Err(e) => op_error(e),
                }
            }
        }
    }
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn render_docs(doctype: &str, docs: Vec<Document>) -> String {
    let count = docs.len();
    let body: Vec<Value> = docs.into_iter().map(Value::Object).collect();
    format!("Found {count} {doctype} documents:\n{}", render(&json!(body)))
}

fn op_error(e: OpError) -> ToolOutcome {
    match e {
        OpError::Denied(reason) => {
            ToolOutcome::fail(format!("{}: {reason}", reason.client_code()))
        }
        OpError::Failed(fault) => {
            tracing::error!(error = %fault, "tool call failed");
            ToolOutcome::fail(format!("INTERNAL: {fault}"))
        }
    }
}

fn missing(arg: &str) -> ToolOutcome {
    ToolOutcome::fail(format!("INVALID_ARGUMENTS: missing required argument: {arg}"))
}

fn arg_str(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

fn arg_usize(args: &Map<String, Value>, key: &str) -> Option<usize> {
    args.get(key).and_then(Value::as_u64).map(|v| v as usize)
}

fn arg_document(args: &Map<String, Value>, key: &str) -> Option<Document> {
    args.get(key).and_then(Value::as_object).cloned()
}

fn arg_string_list(args: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let list = args.get(key)?.as_array()?;
    Some(
        list.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}
