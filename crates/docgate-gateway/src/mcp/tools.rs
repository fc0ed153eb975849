//! Tool catalog generation.
//!
//! The catalog pairs every advertised tool with a routing binding so
//! `tools/call` never re-parses tool names. Per-doctype tools are only
//! generated for operations the doctype's policy allows; generic tools
//! take the doctype as an argument and are policy-checked at call time
//! like everything else.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};

use docgate_core::policy::Operation;

use crate::policy::PolicyEngine;

/// One discoverable tool.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// How a tool call routes into the orchestrator. `doctype: None` means
/// the generic variant (doctype supplied as an argument).
#[derive(Debug, Clone, PartialEq)]
pub enum ToolBinding {
    ListDoctypes,
    DescribePolicy,
    DoctypeSchema,
    SystemInfo,
    PingBackend,
    GetDoc { doctype: Option<String> },
    ListDocs { doctype: Option<String> },
    SearchDocs { doctype: Option<String> },
    CreateDoc { doctype: Option<String> },
    UpdateDoc { doctype: Option<String> },
    DeleteDoc { doctype: Option<String> },
}

/// Advertised tools plus their call-time routing table.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
    bindings: HashMap<String, ToolBinding>,
}

impl ToolCatalog {
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn binding(&self, tool_name: &str) -> Option<&ToolBinding> {
        self.bindings.get(tool_name)
    }

    fn add(&mut self, name: String, description: String, schema: Value, binding: ToolBinding) {
        self.bindings.insert(name.clone(), binding);
        self.tools.push(Tool {
            name,
            description,
            input_schema: schema,
        });
    }
}

fn slug(doctype: &str) -> String {
    doctype.to_lowercase().replace(' ', "_")
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn doctype_prop() -> Value {
    json!({ "type": "string", "description": "Document type name" })
}

fn name_prop(doctype: &str) -> Value {
    json!({ "type": "string", "description": format!("Name/ID of the {doctype} document") })
}

fn list_props() -> Value {
    json!({
        "filters": { "type": "object", "description": "Filters to apply to the query" },
        "fields": { "type": "array", "items": { "type": "string" } },
        "limit": { "type": "integer", "minimum": 1, "maximum": 100 },
        "offset": { "type": "integer", "minimum": 0 },
    })
}

/// Build the full catalog: fixed generic tools plus per-doctype tools
/// derived from the policy store.
pub fn build_catalog(engine: &PolicyEngine) -> ToolCatalog {
    let mut catalog = ToolCatalog::default();

    catalog.add(
        "list_doctypes".into(),
        "List all configured doctypes and their permissions".into(),
        object_schema(json!({}), &[]),
        ToolBinding::ListDoctypes,
    );
    catalog.add(
        "get_doctype_policy".into(),
        "Get the effective access policy for a doctype".into(),
        object_schema(json!({ "doctype": doctype_prop() }), &["doctype"]),
        ToolBinding::DescribePolicy,
    );
    catalog.add(
        "get_doctype_schema".into(),
        "Get schema/metadata for a configured doctype".into(),
        object_schema(json!({ "doctype": doctype_prop() }), &["doctype"]),
        ToolBinding::DoctypeSchema,
    );
    catalog.add(
        "get_system_info".into(),
        "Get backend system information".into(),
        object_schema(json!({}), &[]),
        ToolBinding::SystemInfo,
    );
    catalog.add(
        "ping_backend".into(),
        "Check connectivity to the backend document API".into(),
        object_schema(json!({}), &[]),
        ToolBinding::PingBackend,
    );

    let mut generic_list = list_props();
    if let Value::Object(props) = &mut generic_list {
        props.insert("doctype".into(), doctype_prop());
    }
    catalog.add(
        "get_document".into(),
        "Get any document by doctype and name".into(),
        object_schema(
            json!({ "doctype": doctype_prop(), "name": name_prop("requested") }),
            &["doctype", "name"],
        ),
        ToolBinding::GetDoc { doctype: None },
    );
    catalog.add(
        "list_documents".into(),
        "List documents for any doctype".into(),
        object_schema(generic_list, &["doctype"]),
        ToolBinding::ListDocs { doctype: None },
    );
    catalog.add(
        "search_documents".into(),
        "Search documents by name for any doctype".into(),
        object_schema(
            json!({
                "doctype": doctype_prop(),
                "search_term": { "type": "string" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 50 },
            }),
            &["doctype", "search_term"],
        ),
        ToolBinding::SearchDocs { doctype: None },
    );
    catalog.add(
        "create_document".into(),
        "Create a document for any doctype".into(),
        object_schema(
            json!({ "doctype": doctype_prop(), "data": { "type": "object" } }),
            &["doctype", "data"],
        ),
        ToolBinding::CreateDoc { doctype: None },
    );
    catalog.add(
        "update_document".into(),
        "Update a document for any doctype".into(),
        object_schema(
            json!({
                "doctype": doctype_prop(),
                "name": name_prop("target"),
                "data": { "type": "object" },
            }),
            &["doctype", "name", "data"],
        ),
        ToolBinding::UpdateDoc { doctype: None },
    );
    catalog.add(
        "delete_document".into(),
        "Delete a document for any doctype (requires confirm)".into(),
        object_schema(
            json!({
                "doctype": doctype_prop(),
                "name": name_prop("target"),
                "confirm": { "type": "boolean" },
            }),
            &["doctype", "name", "confirm"],
        ),
        ToolBinding::DeleteDoc { doctype: None },
    );

    for doctype in engine.list_doctypes() {
        let s = slug(&doctype);
        let dt = Some(doctype.clone());

        if engine.can_perform(&doctype, Operation::Read) {
            catalog.add(
                format!("list_{s}_documents"),
                format!("List {doctype} documents with optional filters"),
                object_schema(list_props(), &[]),
                ToolBinding::ListDocs { doctype: dt.clone() },
            );
            catalog.add(
                format!("get_{s}_document"),
                format!("Get a specific {doctype} document by name"),
                object_schema(json!({ "name": name_prop(&doctype) }), &["name"]),
                ToolBinding::GetDoc { doctype: dt.clone() },
            );
            catalog.add(
                format!("search_{s}_documents"),
                format!("Search {doctype} documents by name"),
                object_schema(
                    json!({
                        "search_term": { "type": "string" },
                        "limit": { "type": "integer", "minimum": 1, "maximum": 50 },
                    }),
                    &["search_term"],
                ),
                ToolBinding::SearchDocs { doctype: dt.clone() },
            );
        }
        if engine.can_perform(&doctype, Operation::Create) {
            catalog.add(
                format!("create_{s}_document"),
                format!("Create a new {doctype} document"),
                object_schema(json!({ "data": { "type": "object" } }), &["data"]),
                ToolBinding::CreateDoc { doctype: dt.clone() },
            );
        }
        if engine.can_perform(&doctype, Operation::Update) {
            catalog.add(
                format!("update_{s}_document"),
                format!("Update an existing {doctype} document"),
                object_schema(
                    json!({ "name": name_prop(&doctype), "data": { "type": "object" } }),
                    &["name", "data"],
                ),
                ToolBinding::UpdateDoc { doctype: dt.clone() },
            );
        }
        if engine.can_perform(&doctype, Operation::Delete) {
            catalog.add(
                format!("delete_{s}_document"),
                format!("Delete a {doctype} document (requires confirm)"),
                object_schema(
                    json!({ "name": name_prop(&doctype), "confirm": { "type": "boolean" } }),
                    &["name", "confirm"],
                ),
                ToolBinding::DeleteDoc { doctype: dt },
            );
        }
    }

    catalog
}
