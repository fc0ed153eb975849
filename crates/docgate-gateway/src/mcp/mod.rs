//! MCP tool surface.
//!
//! Exposes the gateway's operations as discoverable tools over
//! JSON-RPC 2.0. The tool catalog is generated from the policy store
//! at startup: a doctype only grows tools for the operations its
//! policy allows, so the surface itself reflects the access model.

pub mod jsonrpc;
pub mod service;
pub mod tools;

pub use service::McpService;
pub use tools::{build_catalog, Tool, ToolCatalog};
