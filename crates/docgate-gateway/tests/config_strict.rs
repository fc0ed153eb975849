#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use docgate_core::error::DocGateError;
use docgate_gateway::config;

const MINIMAL: &str = r#"
version: 1
backend:
  url: "https://erp.example.com"
  api_key: "key"
  api_secret: "secret"
policies:
  Customer:
    operations: { read: true }
"#;

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str(MINIMAL).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert!(cfg.cache.enabled);
    assert_eq!(cfg.rate_limit.per_minute, 60);
    assert!(cfg.policies.contains_key("Customer"));
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
backend:
  url: "https://erp.example.com"
  api_key: "key"
  api_secret: "secret"
cache:
  ttl_seconds: 300 # typo should fail
policies:
  Customer:
    operations: { read: true }
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, DocGateError::Config(_)));
}

#[test]
fn empty_policies_rejected() {
    let bad = r#"
version: 1
backend:
  url: "https://erp.example.com"
  api_key: "key"
  api_secret: "secret"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("policies"));
}

#[test]
fn malformed_predicate_is_fatal_at_load() {
    let bad = r#"
version: 1
backend:
  url: "https://erp.example.com"
  api_key: "key"
  api_secret: "secret"
policies:
  Customer:
    operations: { update: true }
    conditions:
      update:
        credit_limit: { min: 0 }
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("unsupported predicate operator"));
}

#[test]
fn duplicate_doctype_keys_rejected() {
    let bad = r#"
version: 1
backend:
  url: "https://erp.example.com"
  api_key: "key"
  api_secret: "secret"
policies:
  Customer:
    operations: { read: true }
  Customer:
    operations: { read: false }
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().to_lowercase().contains("duplicate"));
}

#[test]
fn out_of_range_cache_ttl_rejected() {
    let bad = r#"
version: 1
backend:
  url: "https://erp.example.com"
  api_key: "key"
  api_secret: "secret"
cache:
  ttl_secs: 0
policies:
  Customer:
    operations: { read: true }
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn zero_rate_budget_rejected_when_enabled() {
    let bad = r#"
version: 1
backend:
  url: "https://erp.example.com"
  api_key: "key"
  api_secret: "secret"
rate_limit:
  per_minute: 0
policies:
  Customer:
    operations: { read: true }
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn rate_limit_ignored_when_disabled() {
    let ok = r#"
version: 1
backend:
  url: "https://erp.example.com"
  api_key: "key"
  api_secret: "secret"
rate_limit:
  enabled: false
  per_minute: 0
policies:
  Customer:
    operations: { read: true }
"#;
    assert!(config::load_from_str(ok).is_ok());
}
