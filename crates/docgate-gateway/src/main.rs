//! docgate gateway binary.
//!
//! Loads strict YAML config, builds the policy/cache/limiter stack,
//! and serves the MCP tool surface over HTTP.

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use docgate_gateway::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "docgate.yaml".to_string());

    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .expect("gateway.listen must be a valid SocketAddr");

    let doctypes: Vec<&str> = cfg.policies.keys().map(String::as_str).collect();
    tracing::info!(%listen, config = %path, doctypes = ?doctypes, "docgate starting");

    let state = app_state::AppState::new(cfg).expect("state build failed");
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .expect("failed to bind");

    axum::serve(listener, app).await.expect("server failed");
}
