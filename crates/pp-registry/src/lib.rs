//! The adapter registry (§4.5 C5).
//!
//! Owns two maps: `factories` (source kind → constructor, registered once at
//! process init) and `adapters` (source name → live adapter, populated by
//! [`Registry::create_all`] and torn down by [`Registry::cleanup`]).
//!
//! Per §5's shared-resource policy, the adapter map is many-readers/
//! single-writer: writes only happen during [`Registry::create_all`] and
//! [`Registry::cleanup`] (startup/shutdown), and a pipeline invocation takes
//! a [`Registry::snapshot`] once at the start of fan-out rather than holding
//! the lock for the invocation's duration.

mod factory;
mod feedback;

pub use factory::AdapterFactory;
pub use feedback::FeedbackStats;

use chrono::Utc;
use pp_adapter::SourceAdapter;
use pp_types::{HealthCheck, SourceConfig, SourceKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// One adapter's entry in the registry: the live adapter plus the config it
/// was constructed from (kept around for `priority`/`timeout` the pipeline's
/// planning stage needs without a second lookup).
#[derive(Clone)]
pub struct AdapterEntry {
    pub adapter: Arc<dyn SourceAdapter>,
    pub config: SourceConfig,
}

/// Outcome of one [`Registry::create_all`] call: which sources became live
/// adapters and which were skipped, with a reason, per §4.5's "failures are
/// logged and the config is skipped (continue with remaining)".
#[derive(Debug, Default)]
pub struct CreateOutcome {
    pub created: Vec<String>,
    pub skipped: Vec<(String, String)>,
}

impl CreateOutcome {
    pub fn all_failed(&self) -> bool {
        self.created.is_empty() && !self.skipped.is_empty()
    }
}

/// Factory map + live adapter map + per-adapter feedback counters.
pub struct Registry {
    factories: RwLock<HashMap<SourceKind, AdapterFactory>>,
    adapters: RwLock<HashMap<String, AdapterEntry>>,
    feedback: RwLock<HashMap<String, FeedbackStats>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            adapters: RwLock::new(HashMap::new()),
            feedback: RwLock::new(HashMap::new()),
        }
    }

    /// A registry pre-populated with the workspace's own five adapter kinds
    /// (`pp_adapters::build`, dispatched by `SourceConfig::settings`'s tag).
    /// `breaker_defaults` is captured into every factory and threaded to
    /// `pp_adapters::build` so each adapter's circuit breaker is tuned from
    /// the app's configured defaults rather than library defaults. Most
    /// callers want this; [`Registry::new`] is for tests that want to
    /// register narrower stub factories.
    pub async fn with_default_factories(breaker_defaults: pp_config::CircuitBreakerDefaults) -> Self {
        let registry = Self::new();
        for kind in [
            SourceKind::File,
            SourceKind::GitHost,
            SourceKind::Wiki,
            SourceKind::Database,
            SourceKind::Web,
        ] {
            registry
                .register_factory(
                    kind,
                    Arc::new(move |cfg: &SourceConfig| pp_adapters::build(cfg, &breaker_defaults)),
                )
                .await;
        }
        registry
    }

    /// Registers a constructor for a source kind. Typically called once at
    /// process init, before any `create_all` call; re-registering a kind
    /// replaces its prior factory.
    pub async fn register_factory(&self, kind: SourceKind, factory: AdapterFactory) {
        self.factories.write().await.insert(kind, factory);
    }

    /// Constructs and initializes one adapter per enabled config. Per-config
    /// failures (missing factory, construction error, `initialize` error) are
    /// recorded in the returned [`CreateOutcome`] and do not abort the rest
    /// of the batch. A config whose `name` collides with an already-admitted
    /// adapter is skipped — names are unique across the registry.
    pub async fn create_all(&self, configs: &[SourceConfig]) -> CreateOutcome {
        let mut outcome = CreateOutcome::default();

        for config in configs {
            if !config.enabled {
                continue;
            }

            if self.adapters.read().await.contains_key(&config.name) {
                outcome
                    .skipped
                    .push((config.name.clone(), "duplicate source name".to_string()));
                continue;
            }

            let factory = { self.factories.read().await.get(&config.kind).cloned() };
            let Some(factory) = factory else {
                #[cfg(feature = "tracing")]
                tracing::warn!(source = %config.name, kind = %config.kind, "no factory registered for source kind");
                outcome.skipped.push((
                    config.name.clone(),
                    format!("no factory registered for kind {}", config.kind),
                ));
                continue;
            };

            let adapter = match factory(config) {
                Ok(adapter) => adapter,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(source = %config.name, error = %e, "adapter construction failed");
                    outcome.skipped.push((config.name.clone(), e.to_string()));
                    continue;
                }
            };

            if let Err(e) = adapter.initialize().await {
                #[cfg(feature = "tracing")]
                tracing::warn!(source = %config.name, error = %e, "adapter initialize failed");
                outcome.skipped.push((config.name.clone(), e.to_string()));
                continue;
            }

            self.adapters.write().await.insert(
                config.name.clone(),
                AdapterEntry {
                    adapter: Arc::from(adapter),
                    config: config.clone(),
                },
            );
            outcome.created.push(config.name.clone());
        }

        if outcome.created.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!("registry create_all produced zero live adapters");
        }

        outcome
    }

    /// A point-in-time clone of the adapter map, per §5's "readers take a
    /// snapshot for a given pipeline invocation" — the pipeline fans out
    /// over this rather than holding the registry's lock across its own
    /// suspension points.
    pub async fn snapshot(&self) -> Vec<AdapterEntry> {
        self.adapters.read().await.values().cloned().collect()
    }

    /// Looks up a single adapter entry by name.
    pub async fn get(&self, name: &str) -> Option<AdapterEntry> {
        self.adapters.read().await.get(name).cloned()
    }

    /// Number of live adapters currently admitted.
    pub async fn len(&self) -> usize {
        self.adapters.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.adapters.read().await.is_empty()
    }

    /// Fans `healthcheck` out to every live adapter in parallel under a
    /// shared deadline. An adapter whose call does not complete within
    /// `deadline` is reported unhealthy with `error_message` populated
    /// rather than omitted — the contract never throws.
    pub async fn healthcheck_all(&self, deadline: Duration) -> Vec<HealthCheck> {
        let entries = self.snapshot().await;
        let checks = entries.into_iter().map(|entry| async move {
            match tokio::time::timeout(deadline, entry.adapter.healthcheck()).await {
                Ok(check) => check,
                Err(_elapsed) => HealthCheck {
                    source_name: entry.config.name.clone(),
                    healthy: false,
                    response_time_ms: deadline.as_millis() as u64,
                    last_check: Utc::now(),
                    error_message: Some(format!("healthcheck exceeded {deadline:?}")),
                },
            }
        });
        futures::future::join_all(checks).await
    }

    /// Calls `cleanup` on every live adapter with bounded concurrency,
    /// swallowing individual failures (the contract is infallible, but a
    /// panicking adapter must not block the rest of shutdown). Clears the
    /// adapter map once every cleanup has returned.
    pub async fn cleanup(&self, max_concurrency: usize) {
        use futures::StreamExt;

        let entries = self.snapshot().await;
        futures::stream::iter(entries)
            .for_each_concurrent(max_concurrency.max(1), |entry| async move {
                entry.adapter.cleanup().await;
            })
            .await;
        self.adapters.write().await.clear();
    }

    /// Records one resolution-feedback event against an adapter's running
    /// success-rate counters. The sole path by which adapter success rates
    /// may update (§4.7) — callers should route through the tool layer's
    /// `record_resolution_feedback`, which also owns the idempotency window.
    pub async fn record_feedback(
        &self,
        source_name: &str,
        successful: bool,
        resolution_minutes: f64,
    ) {
        let mut feedback = self.feedback.write().await;
        feedback
            .entry(source_name.to_string())
            .or_default()
            .record(successful, resolution_minutes);
    }

    /// A snapshot of one adapter's feedback-derived stats, if any feedback
    /// has been recorded for it yet.
    pub async fn feedback_stats(&self, source_name: &str) -> Option<FeedbackStats> {
        self.feedback.read().await.get(source_name).copied()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pp_adapter::{AdapterError, AdapterMetadata, AdapterResult};
    use pp_types::{Document, Filter, Runbook, Severity, SourceSettings};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubAdapter {
        name: String,
        healthy: bool,
        hang: bool,
        cleaned_up: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        async fn initialize(&self) -> AdapterResult<()> {
            Ok(())
        }

        async fn search(&self, _query: &str, _filters: &Filter) -> AdapterResult<Vec<Document>> {
            Ok(vec![])
        }

        async fn get(&self, _id: &str) -> AdapterResult<Document> {
            Err(AdapterError::NotFound)
        }

        async fn search_runbooks(
            &self,
            _alert_type: &str,
            _severity: Severity,
            _affected_systems: &[String],
            _context: Option<&str>,
        ) -> AdapterResult<Vec<Runbook>> {
            Ok(vec![])
        }

        async fn healthcheck(&self) -> HealthCheck {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.healthy {
                HealthCheck::healthy(self.name.clone(), 1)
            } else {
                HealthCheck::unhealthy(self.name.clone(), "stub failure")
            }
        }

        async fn refresh_index(&self, _force: bool) -> bool {
            true
        }

        fn metadata(&self) -> AdapterMetadata {
            AdapterMetadata::new(self.name.clone(), SourceKind::File)
        }

        async fn cleanup(&self) {
            self.cleaned_up.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stub_config(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            kind: SourceKind::File,
            priority: 0,
            enabled: true,
            refresh_interval: Duration::from_secs(60),
            timeout: Duration::from_secs(5),
            max_retries: 0,
            credentials: None,
            settings: SourceSettings::File {
                roots: vec![],
                include: vec![],
                exclude: vec![],
                max_depth: 1,
                watch: false,
            },
        }
    }

    async fn registry_with_stub(name: &str, healthy: bool, hang: bool) -> (Registry, Arc<AtomicUsize>) {
        let registry = Registry::new();
        let cleaned_up = Arc::new(AtomicUsize::new(0));
        let cu = Arc::clone(&cleaned_up);
        let healthy_flag = healthy;
        registry
            .register_factory(
                SourceKind::File,
                Arc::new(move |cfg: &SourceConfig| {
                    Ok(Box::new(StubAdapter {
                        name: cfg.name.clone(),
                        healthy: healthy_flag,
                        hang,
                        cleaned_up: Arc::clone(&cu),
                    }) as Box<dyn SourceAdapter>)
                }),
            )
            .await;
        registry.create_all(&[stub_config(name)]).await;
        (registry, cleaned_up)
    }

    #[tokio::test]
    async fn create_all_admits_at_most_one_adapter_per_name() {
        let (registry, _) = registry_with_stub("docs", true, false).await;
        let outcome = registry.create_all(&[stub_config("docs")]).await;
        assert!(outcome.created.is_empty());
        assert_eq!(outcome.skipped[0].1, "duplicate source name");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn create_all_skips_config_with_no_registered_factory() {
        let registry = Registry::new();
        let outcome = registry.create_all(&[stub_config("docs")]).await;
        assert!(outcome.created.is_empty());
        assert!(outcome.all_failed());
    }

    #[tokio::test]
    async fn healthcheck_all_reports_unhealthy_on_timeout() {
        let (registry, _) = registry_with_stub("slow", true, true).await;
        let checks = registry.healthcheck_all(Duration::from_millis(20)).await;
        assert_eq!(checks.len(), 1);
        assert!(!checks[0].healthy);
        assert!(checks[0].error_message.as_ref().unwrap().contains("exceeded"));
    }

    #[tokio::test]
    async fn healthcheck_all_fans_out_in_parallel() {
        let registry = Registry::new();
        let cleaned_up = Arc::new(AtomicUsize::new(0));
        registry
            .register_factory(
                SourceKind::File,
                Arc::new({
                    let cu = Arc::clone(&cleaned_up);
                    move |cfg: &SourceConfig| {
                        Ok(Box::new(StubAdapter {
                            name: cfg.name.clone(),
                            healthy: true,
                            hang: true,
                            cleaned_up: Arc::clone(&cu),
                        }) as Box<dyn SourceAdapter>)
                    }
                }),
            )
            .await;
        registry
            .create_all(&[stub_config("a"), stub_config("b"), stub_config("c")])
            .await;

        let start = std::time::Instant::now();
        let checks = registry.healthcheck_all(Duration::from_millis(50)).await;
        assert_eq!(checks.len(), 3);
        assert!(
            start.elapsed() < Duration::from_millis(150),
            "three healthchecks should run concurrently, not serially"
        );
    }

    #[tokio::test]
    async fn cleanup_clears_the_adapter_map_and_calls_every_adapter() {
        let (registry, cleaned_up) = registry_with_stub("docs", true, false).await;
        registry.cleanup(4).await;
        assert_eq!(cleaned_up.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn feedback_accumulates_across_calls() {
        let registry = Registry::new();
        registry.record_feedback("docs", true, 10.0).await;
        registry.record_feedback("docs", false, 20.0).await;

        let stats = registry.feedback_stats("docs").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.success_rate(), 0.5);
        assert_eq!(stats.avg_resolution_minutes(), 15.0);
    }

    #[tokio::test]
    async fn disabled_config_is_never_constructed() {
        let registry = Registry::new();
        let mut cfg = stub_config("docs");
        cfg.enabled = false;
        registry
            .register_factory(
                SourceKind::File,
                Arc::new(|cfg: &SourceConfig| {
                    panic!("factory should not be called for {}", cfg.name)
                }),
            )
            .await;
        let outcome = registry.create_all(&[cfg]).await;
        assert!(outcome.created.is_empty());
        assert!(outcome.skipped.is_empty());
    }
}
