//! Axum router wiring.
//!
//! - `POST /v1/mcp` : JSON-RPC 2.0 MCP endpoint (stateless)
//! - `GET /healthz` : liveness

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::app_state::AppState;

/// Header carrying the already-authenticated caller identity; the
/// gateway performs no authentication itself.
const IDENTITY_HEADER: &str = "x-docgate-identity";
const DEFAULT_IDENTITY: &str = "anonymous";

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/mcp", post(mcp_endpoint))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn mcp_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let identity = headers
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_IDENTITY)
        .to_string();

    match state.mcp().handle(&identity, body).await {
        Some(resp) => Json(resp).into_response(),
        // Notification: acknowledged, nothing to return.
        None => StatusCode::ACCEPTED.into_response(),
    }
}
