//! The configuration surface of §6: `server`/`cache`/`sources`/
//! `circuit_breaker`, as a `serde::Deserialize` data shape callers construct
//! and hand to the orchestrator.
//!
//! Loading behavior (schema migration, hot reload, multi-file merge) is out
//! of scope — this crate only parses TOML into the typed shape below and
//! performs whatever validation `serde` gives for free. Cross-field
//! validation is the embedder's job.

mod error;
mod server;

pub use error::ConfigError;
pub use server::{LogLevel, ServerConfig};

use pp_types::SourceConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// The full configuration surface: everything the orchestrator needs to
/// bring the service up (§4.9 "load config" is the first startup step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerDefaults,
}

/// Cache section of the configuration surface (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub strategy: CacheStrategyName,
    #[serde(default)]
    pub memory: MemoryCacheSettings,
    #[serde(default)]
    pub distributed: DistributedCacheSettings,
    #[serde(default)]
    pub content_types: HashMap<String, ContentTypeSettings>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: CacheStrategyName::default(),
            memory: MemoryCacheSettings::default(),
            distributed: DistributedCacheSettings::default(),
            content_types: HashMap::new(),
        }
    }
}

/// Mirrors `pp_cache::CacheStrategy`, kept as its own type here so this
/// crate does not need to depend on `pp-cache` just to describe config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategyName {
    MemoryOnly,
    DistributedOnly,
    Hybrid,
}

impl Default for CacheStrategyName {
    fn default() -> Self {
        CacheStrategyName::Hybrid
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheSettings {
    #[serde(default = "default_max_keys")]
    pub max_keys: usize,
    #[serde(with = "duration_secs", default = "default_memory_ttl")]
    pub ttl: Duration,
    #[serde(with = "duration_secs", default = "default_check_period")]
    pub check_period: Duration,
}

impl Default for MemoryCacheSettings {
    fn default() -> Self {
        Self {
            max_keys: default_max_keys(),
            ttl: default_memory_ttl(),
            check_period: default_check_period(),
        }
    }
}

fn default_max_keys() -> usize {
    10_000
}

fn default_memory_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_check_period() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedCacheSettings {
    #[serde(default)]
    pub enabled: bool,
    pub url: Option<String>,
    #[serde(with = "duration_secs", default = "default_memory_ttl")]
    pub ttl: Duration,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(with = "duration_secs", default = "default_connection_timeout")]
    pub connection_timeout: Duration,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(with = "duration_secs", default = "default_retry_delay")]
    pub retry_delay: Duration,
    #[serde(with = "duration_secs", default = "default_max_retry_delay")]
    pub max_retry_delay: Duration,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_connection_retry_limit")]
    pub connection_retry_limit: u32,
}

impl Default for DistributedCacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            ttl: default_memory_ttl(),
            key_prefix: default_key_prefix(),
            connection_timeout: default_connection_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
            max_retry_delay: default_max_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            connection_retry_limit: default_connection_retry_limit(),
        }
    }
}

fn default_key_prefix() -> String {
    "pp".to_string()
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_max_retry_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_connection_retry_limit() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTypeSettings {
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    #[serde(default)]
    pub warmup: bool,
}

/// Circuit breaker defaults applied to any source config that doesn't
/// override them (§6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircuitBreakerDefaults {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,
    #[serde(with = "duration_secs", default = "default_recovery_timeout")]
    pub recovery_timeout: Duration,
    #[serde(with = "duration_secs", default = "default_monitoring_window")]
    pub monitoring_window: Duration,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: usize,
    #[serde(with = "duration_secs", default = "default_operation_timeout")]
    pub operation_timeout: Duration,
}

impl Default for CircuitBreakerDefaults {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout: default_recovery_timeout(),
            monitoring_window: default_monitoring_window(),
            success_threshold: default_success_threshold(),
            operation_timeout: default_operation_timeout(),
        }
    }
}

fn default_failure_threshold() -> usize {
    5
}

fn default_recovery_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_monitoring_window() -> Duration {
    Duration::from_secs(300)
}

fn default_success_threshold() -> usize {
    3
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

/// Serializes a [`Duration`] as whole seconds, the same convention
/// `pp_types::source` uses for `SourceConfig`'s `timeout`/`refresh_interval`
/// — humans editing a TOML file write `ttl = 300`, not a nested struct.
mod duration_secs {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Parses a TOML document into an [`AppConfig`]. No cross-field validation
/// beyond what `serde`'s `Deserialize` performs for free — see the module
/// doc for why.
pub fn load_from_str(src: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str(src).map_err(ConfigError::Parse)
}

/// Reads and parses a TOML file at `path`.
pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<AppConfig, ConfigError> {
    let src = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    load_from_str(&src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_fills_in_every_default() {
        let cfg = load_from_str("").expect("empty document uses defaults throughout");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.cache.strategy, CacheStrategyName::Hybrid);
        assert_eq!(cfg.circuit_breaker.failure_threshold, 5);
        assert!(cfg.sources.is_empty());
    }

    #[test]
    fn parses_a_representative_document() {
        let src = r#"
            [server]
            host = "0.0.0.0"
            port = 3000
            log_level = "debug"
            max_concurrent_requests = 200
            request_timeout = 30
            health_check_interval = 15

            [cache]
            enabled = true
            strategy = "hybrid"

            [cache.memory]
            max_keys = 5000
            ttl = 120

            [cache.distributed]
            enabled = true
            url = "redis://localhost:6379"
            ttl = 600

            [cache.content_types.runbooks]
            ttl = 3600
            warmup = true

            [[sources]]
            name = "docs"
            kind = "file"
            timeout = 5

            [sources.settings]
            kind = "file"
            roots = ["/srv/docs"]

            [circuit_breaker]
            failure_threshold = 10
        "#;
        let cfg = load_from_str(src).expect("valid document parses");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.log_level, LogLevel::Debug);
        assert!(cfg.cache.distributed.enabled);
        assert_eq!(cfg.cache.distributed.url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(
            cfg.cache.content_types.get("runbooks").unwrap().ttl,
            Duration::from_secs(3600)
        );
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.circuit_breaker.failure_threshold, 10);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = load_from_str("this is not [ valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
