//! docgate gateway library entry.
//!
//! This crate wires config loading, the policy engine, the TTL cache,
//! the rate limiter, the backend client, and the MCP tool surface into
//! a cohesive gateway stack. It is intended to be consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod audit;
pub mod backend;
pub mod cache;
pub mod config;
pub mod mcp;
pub mod ops;
pub mod policy;
pub mod ratelimit;
pub mod router;
