//! Shared application state.
//!
//! Everything is built once from validated config and injected
//! explicitly: policy store, audit sink, cache, rate limiter, backend.
//! No process-wide singletons, so tests can construct fresh isolated
//! instances.

use std::sync::Arc;
use std::time::Duration;

use docgate_core::audit::AuditSink;
use docgate_core::error::Result;
use docgate_core::policy::PolicyStore;

use crate::audit::{NoopAuditSink, TracingAuditSink};
use crate::backend::HttpBackend;
use crate::cache::TtlCache;
use crate::config::GatewayConfig;
use crate::mcp::McpService;
use crate::ops::Orchestrator;
use crate::policy::PolicyEngine;
use crate::ratelimit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    mcp: McpService,
}

impl AppState {
    /// Build application state from validated config.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let store = Arc::new(PolicyStore::new(cfg.policies.clone())?);

        let sink: Arc<dyn AuditSink> = if cfg.audit.enabled {
            Arc::new(TracingAuditSink)
        } else {
            Arc::new(NoopAuditSink)
        };
        let engine = Arc::new(PolicyEngine::new(store, sink));

        let cache = cfg.cache.enabled.then(|| {
            Arc::new(TtlCache::new(
                Duration::from_secs(cfg.cache.ttl_secs),
                cfg.cache.max_size,
            ))
        });
        let limiter = cfg.rate_limit.enabled.then(|| {
            Arc::new(RateLimiter::new(
                cfg.rate_limit.per_minute,
                cfg.rate_limit.per_hour,
                Duration::from_secs(cfg.rate_limit.gc_idle_secs),
            ))
        });

        let backend = Arc::new(HttpBackend::new(&cfg.backend)?);
        let orchestrator = Arc::new(Orchestrator::new(
            engine,
            backend,
            cache,
            limiter,
            cfg.rate_limit.scope,
        ));
        let mcp = McpService::new(orchestrator);

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, mcp }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn mcp(&self) -> &McpService {
        &self.inner.mcp
    }
}
