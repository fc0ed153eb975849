use std::collections::BTreeMap;

use serde::Deserialize;

use docgate_core::error::{DocGateError, Result};
use docgate_core::policy::DoctypePolicy;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    pub backend: BackendSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub rate_limit: RateLimitSection,

    #[serde(default)]
    pub audit: AuditSection,

    /// Doctype name -> access policy. Duplicate keys are rejected by
    /// the YAML parser itself; an empty map is a config error.
    #[serde(default)]
    pub policies: BTreeMap<String, DoctypePolicy>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(DocGateError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        if self.policies.is_empty() {
            return Err(DocGateError::Config("policies must not be empty".into()));
        }
        self.backend.validate()?;
        self.cache.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8090".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    /// Base URL of the document API, e.g. "https://erp.example.com".
    pub url: String,

    pub api_key: String,
    pub api_secret: String,

    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

impl BackendSection {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(DocGateError::Config("backend.url must not be empty".into()));
        }
        if !(1000..=300_000).contains(&self.timeout_ms) {
            return Err(DocGateError::Config(
                "backend.timeout_ms must be between 1000 and 300000".into(),
            ));
        }
        Ok(())
    }
}

fn default_backend_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl_secs(),
            max_size: default_cache_max_size(),
        }
    }
}

impl CacheSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=86_400).contains(&self.ttl_secs) {
            return Err(DocGateError::Config(
                "cache.ttl_secs must be between 1 and 86400".into(),
            ));
        }
        if self.max_size == 0 {
            return Err(DocGateError::Config("cache.max_size must be at least 1".into()));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_cache_max_size() -> usize {
    1000
}

/// Unit against which rate limiting is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateScope {
    /// One process-wide budget.
    Global,
    /// One budget per caller identity.
    Identity,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_per_minute")]
    pub per_minute: u32,

    #[serde(default = "default_per_hour")]
    pub per_hour: u32,

    #[serde(default = "default_rate_scope")]
    pub scope: RateScope,

    /// Idle scopes older than this are garbage-collected.
    #[serde(default = "default_gc_idle_secs")]
    pub gc_idle_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
            scope: default_rate_scope(),
            gc_idle_secs: default_gc_idle_secs(),
        }
    }
}

impl RateLimitSection {
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.per_minute == 0 || self.per_hour == 0 {
            return Err(DocGateError::Config(
                "rate_limit budgets must be at least 1 when enabled".into(),
            ));
        }
        if self.per_hour < self.per_minute {
            return Err(DocGateError::Config(
                "rate_limit.per_hour must not be smaller than per_minute".into(),
            ));
        }
        if self.gc_idle_secs < 3600 {
            return Err(DocGateError::Config(
                "rate_limit.gc_idle_secs must be at least 3600".into(),
            ));
        }
        Ok(())
    }
}

fn default_per_minute() -> u32 {
    60
}
fn default_per_hour() -> u32 {
    1000
}
fn default_rate_scope() -> RateScope {
    RateScope::Global
}
fn default_gc_idle_secs() -> u64 {
    7200
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}
