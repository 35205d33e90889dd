//! Process lifecycle (§4.9, C9): startup/shutdown sequencing and dependency
//! injection for every other crate in the workspace.
//!
//! [`Orchestrator::start`] constructs, in order, the cache, the adapter
//! registry (with its factories pre-registered), the source adapters
//! themselves (best-effort — a failing source is logged and skipped, not
//! fatal), the retrieval pipeline, and the tool layer; then schedules cache
//! warmers and opens the gate for traffic. [`Orchestrator::shutdown`] runs
//! that sequence in reverse: stop admitting new calls, wait out a grace
//! period for in-flight ones to drain, tear the registry down, clear the
//! cache.
//!
//! No part of this is a global singleton (§9 Design Notes): every handle an
//! `Orchestrator` hands out is an `Arc` constructed here and passed down,
//! never reached for through a static.

mod error;
mod health;
mod performance;
mod warmup;

pub use error::OrchestratorError;
pub use health::HealthReport;
pub use performance::PerformanceTracker;

use futures::future::BoxFuture;
use pp_bulkhead::BulkheadLayer;
use pp_cache::{Cache, CacheConfig, CacheStrategy, ContentType};
use pp_config::{AppConfig, CacheStrategyName};
use pp_pipeline::{Pipeline, PipelineConfig};
use pp_registry::Registry;
use pp_tools::{ToolError, ToolResult, Tools};
use pp_types::SearchResult;
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};

/// A tool-layer call boxed up so that one concrete [`DispatchGate`] can gate
/// calls of any return type `T`: the caller's future already produces the
/// final `Box<dyn Any + Send>`, so the gate itself only ever sees this one
/// request/response shape.
type BoxedToolCall = BoxFuture<'static, ToolResult<Box<dyn Any + Send>>>;

/// The bulkhead-guarded dispatch gate (§5 "Backpressure"): bounds concurrent
/// tool-layer calls and rejects immediately, rather than queueing, once the
/// bound is reached.
type DispatchGate = BoxCloneService<BoxedToolCall, Box<dyn Any + Send>, ToolError>;

fn passthrough(fut: BoxedToolCall) -> BoxedToolCall {
    fut
}

/// Delay between "accepting traffic" and the first cache-warming pass,
/// matching §8 scenario 6 ("after 5 s of uptime").
const WARMUP_DELAY: Duration = Duration::from_secs(5);

/// Bound on concurrent `cleanup` calls during shutdown, mirroring
/// `Registry::cleanup`'s own `max_concurrency` parameter.
const SHUTDOWN_CLEANUP_CONCURRENCY: usize = 8;

/// Owns every long-lived handle the service needs and gates access to the
/// tool layer behind a global inflight bound (§5 "Backpressure").
pub struct Orchestrator {
    config: AppConfig,
    registry: Arc<Registry>,
    cache: Arc<Cache<SearchResult>>,
    runbook_cache: Arc<Cache<pp_types::Runbook>>,
    tools: Arc<Tools>,
    performance: PerformanceTracker,
    gate: DispatchGate,
    inflight: Arc<AtomicUsize>,
    drained: Arc<Notify>,
    accepting: AtomicBool,
    started_at: Instant,
}

impl Orchestrator {
    /// Runs the startup sequence of §4.9: cache, registry + factories,
    /// adapters (best-effort), pipeline, tool layer, then schedules cache
    /// warmers and opens the gate.
    ///
    /// Fails fast only on conditions the spec treats as fatal: a malformed
    /// config never reaches this point (the caller parses it with
    /// `pp_config::load_from_str`/`load_from_path` first), and this
    /// function itself fails only if every configured source failed to
    /// construct while at least one was configured — a registry with zero
    /// live adapters can still legitimately serve `list_sources` and
    /// `search_knowledge_base` (which simply finds nothing), but a config
    /// that named sources and got none of them is almost certainly a
    /// deployment mistake worth refusing to start over.
    pub async fn start(config: AppConfig) -> Result<Self, OrchestratorError> {
        let cache = Arc::new(Cache::new(build_cache_config(&config, "knowledge_base")));
        let runbook_cache = Arc::new(Cache::new(build_cache_config(&config, "runbooks")));

        let registry = Arc::new(Registry::with_default_factories(config.circuit_breaker).await);
        let outcome = registry.create_all(&config.sources).await;
        if !config.sources.is_empty() && outcome.all_failed() {
            return Err(OrchestratorError::NoLiveSources(outcome.skipped));
        }
        #[cfg(feature = "tracing")]
        for (name, reason) in &outcome.skipped {
            tracing::warn!(source = %name, reason = %reason, "source skipped during startup");
        }

        let pipeline_config = PipelineConfig::builder()
            .circuit_cooldown(config.circuit_breaker.recovery_timeout)
            .build();
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            pipeline_config,
        ));

        let tools = Arc::new(Tools::new(
            Arc::clone(&registry),
            pipeline,
            Arc::clone(&runbook_cache),
        ));

        let max_concurrent_requests = config.server.max_concurrent_requests.max(1);
        let gate_layer = BulkheadLayer::builder()
            .max_concurrent_calls(max_concurrent_requests)
            .reject_when_full()
            .name("dispatch")
            .build();
        let gate = BoxCloneService::new(gate_layer.layer(tower::service_fn(passthrough)));

        let orchestrator = Self {
            gate,
            inflight: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
            performance: PerformanceTracker::new(),
            accepting: AtomicBool::new(false),
            started_at: Instant::now(),
            runbook_cache,
            registry,
            cache,
            tools: Arc::clone(&tools),
            config,
        };

        warmup::schedule(tools, orchestrator.cache_config().warmup_content_types(), WARMUP_DELAY);
        orchestrator.accepting.store(true, Ordering::Release);
        Ok(orchestrator)
    }

    /// Runs every tool-layer call through the dispatch gate and the
    /// performance tracker. `Overloaded` is returned immediately rather than
    /// queued when the gate is saturated (§5 "new requests fail fast with
    /// `Overloaded` rather than queueing unboundedly").
    pub async fn call<F, Fut, T>(&self, op: F) -> ToolResult<T>
    where
        F: FnOnce(Arc<Tools>) -> Fut + Send + 'static,
        Fut: Future<Output = ToolResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        if !self.accepting_traffic() {
            return Err(ToolError::Unavailable("not accepting traffic".to_string()));
        }

        let tools = Arc::clone(&self.tools);
        let inflight = Arc::clone(&self.inflight);
        let drained = Arc::clone(&self.drained);
        let start = Instant::now();

        let boxed: BoxedToolCall = Box::pin(async move {
            inflight.fetch_add(1, Ordering::AcqRel);
            let result = op(tools).await;
            inflight.fetch_sub(1, Ordering::AcqRel);
            drained.notify_waiters();
            result.map(|value| Box::new(value) as Box<dyn Any + Send>)
        });

        let result = self.gate.clone().oneshot(boxed).await.map(|value| {
            *value
                .downcast::<T>()
                .expect("dispatch gate returns the response type its caller boxed")
        });
        self.performance.record(start.elapsed(), result.is_err());
        result
    }

    /// Runs the shutdown sequence of §4.9 in reverse startup order: stop
    /// admitting new calls, wait up to `grace_period` for in-flight calls to
    /// drain, `cleanup` the registry, clear the cache.
    pub async fn shutdown(self, grace_period: Duration) {
        self.accepting.store(false, Ordering::Release);

        let drain = async {
            loop {
                let notified = self.drained.notified();
                if self.inflight.load(Ordering::Acquire) == 0 {
                    break;
                }
                notified.await;
            }
        };
        let _ = tokio::time::timeout(grace_period, drain).await;

        self.registry.cleanup(SHUTDOWN_CLEANUP_CONCURRENCY).await;
        self.cache.clear_all().await;
        self.runbook_cache.clear_all().await;
    }

    pub fn accepting_traffic(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn cache_config(&self) -> CacheConfig {
        build_cache_config(&self.config, "knowledge_base")
    }
}

fn build_cache_config(config: &AppConfig, name: &str) -> CacheConfig {
    let strategy = match config.cache.strategy {
        CacheStrategyName::MemoryOnly => CacheStrategy::MemoryOnly,
        CacheStrategyName::DistributedOnly => CacheStrategy::DistributedOnly,
        CacheStrategyName::Hybrid => CacheStrategy::Hybrid,
    };

    let mut builder = CacheConfig::builder()
        .name(name)
        .strategy(strategy)
        .default_ttl(config.cache.memory.ttl)
        .l1_max_size(config.cache.memory.max_keys);

    for content_type in ContentType::all() {
        if let Some(settings) = config.cache.content_types.get(content_type.as_str()) {
            builder = builder.policy(content_type, settings.ttl, settings.warmup);
        }
    }
    builder.build()
}
