//! The retrieval pipeline (§4.6 C6): normalize, classify intent, plan,
//! fan out, rank, cache, emit metrics.
//!
//! Owns no long-lived state beyond its own configuration and a small map
//! of recently-observed open breakers (§3 "the `Pipeline` owns no
//! long-lived state beyond configuration") — the adapter map it reads
//! belongs to [`pp_registry::Registry`], and the result cache belongs to
//! [`pp_cache::Cache`].

mod intent;
mod normalize;
mod plan;
mod rank;

pub use intent::{classify, IntentClassification};
pub use normalize::{normalize, NormalizedQuery};
pub use plan::{deadline_for, select_adapters, Plan, MAX_FAN_OUT};
pub use rank::{rank as rank_documents, RankWeights, SourceSignals};

use futures::stream::{FuturesUnordered, StreamExt};
use pp_adapter::AdapterError;
use pp_cache::{Cache, ContentType};
use pp_registry::{AdapterEntry, Registry};
use pp_types::{Document, Filter, SearchResult, SourceOutcome, SourceStatus};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

pub type PipelineError = pp_core::PipelineError<Infallible>;
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Tuning knobs for one [`Pipeline`] instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub weights: RankWeights,
    /// How long an adapter that signaled `CircuitOpen` stays excluded from
    /// planning before it is tried again. Defaults to the circuit
    /// breaker's own `recovery_timeout` (§6 circuit breaker defaults).
    pub circuit_cooldown: Duration,
    /// How far past the plan deadline the fan-out is allowed to keep
    /// waiting when zero adapters have returned anything yet (§4.6 stage 4
    /// "otherwise continue until the global ceiling").
    pub global_ceiling_multiplier: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            weights: RankWeights::default(),
            circuit_cooldown: Duration::from_secs(60),
            global_ceiling_multiplier: 4,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn weights(mut self, weights: RankWeights) -> Self {
        self.config.weights = weights;
        self
    }

    pub fn circuit_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.circuit_cooldown = cooldown;
        self
    }

    pub fn global_ceiling_multiplier(mut self, multiplier: u32) -> Self {
        self.config.global_ceiling_multiplier = multiplier;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

/// Outcome of one adapter's fan-out call.
enum FanOutOutcome {
    Ok(Vec<Document>),
    Timeout,
    CircuitOpen,
    Unavailable,
}

pub struct Pipeline {
    registry: Arc<Registry>,
    cache: Arc<Cache<SearchResult>>,
    config: PipelineConfig,
    circuit_hints: RwLock<HashMap<String, Instant>>,
}

impl Pipeline {
    pub fn new(registry: Arc<Registry>, cache: Arc<Cache<SearchResult>>, config: PipelineConfig) -> Self {
        Self {
            registry,
            cache,
            config,
            circuit_hints: RwLock::new(HashMap::new()),
        }
    }

    /// Runs one query through every stage of §4.6.
    ///
    /// `allow_degraded` corresponds to the caller "explicitly requesting
    /// degraded mode" (§4.6 stage 3): when `true`, adapters with a
    /// recently-observed open breaker are planned anyway.
    pub async fn search(
        &self,
        query: &str,
        filters: Filter,
        context: Option<&str>,
        caller_deadline: Option<Duration>,
        allow_degraded: bool,
    ) -> PipelineResult<SearchResult> {
        let Some(normalized) = normalize(query) else {
            return Ok(SearchResult::default());
        };

        let classification = classify(&normalized.folded, context);
        let deadline = deadline_for(classification.intent, caller_deadline);

        let recently_open = self.recently_open_names().await;
        let snapshot = self.registry.snapshot().await;
        let (selected, skipped) = select_adapters(snapshot, &filters, &recently_open, allow_degraded);

        if selected.is_empty() {
            let source_statuses = skipped
                .into_iter()
                .map(|name| SourceStatus {
                    source_name: name,
                    status: SourceOutcome::Skipped,
                    result_count: 0,
                })
                .collect();
            return Ok(SearchResult {
                documents: Vec::new(),
                source_statuses,
                total_found: 0,
                query_time_ms: 0,
            });
        }

        let plan = Plan {
            deadline,
            adapters: selected,
            skipped_circuit_open: skipped,
        };

        let cache_key = self.cache_key(&normalized.folded, &filters, classification.intent);
        let weights = self.config.weights;

        let result = self
            .cache
            .get_or_load(ContentType::KnowledgeBase, &cache_key, || {
                self.execute(&normalized, &filters, &classification, plan, weights)
            })
            .await;

        match result {
            Ok(search_result) => Ok(search_result),
            Err(pp_cache::CacheError::Loader(e)) => Err(e),
            Err(pp_cache::CacheError::L2(e)) => Err(e),
        }
    }

    async fn execute(
        &self,
        normalized: &NormalizedQuery,
        filters: &Filter,
        classification: &IntentClassification,
        plan: Plan,
        weights: RankWeights,
    ) -> PipelineResult<SearchResult> {
        let start = Instant::now();

        let mut signals = SourceSignals::default();
        for entry in &plan.adapters {
            signals.priority.insert(entry.config.name.clone(), entry.config.priority);
            signals
                .success_rate
                .insert(entry.config.name.clone(), entry.adapter.metadata().success_rate);
        }

        let outcomes = self.fan_out(&normalized.folded, filters, &plan).await;

        let mut documents = Vec::new();
        let mut statuses: Vec<SourceStatus> = plan
            .skipped_circuit_open
            .iter()
            .map(|name| SourceStatus {
                source_name: name.clone(),
                status: SourceOutcome::Skipped,
                result_count: 0,
            })
            .collect();

        let mut any_ok = false;
        let mut any_failure = false;

        for (name, outcome) in outcomes {
            match outcome {
                FanOutOutcome::Ok(docs) => {
                    any_ok = true;
                    statuses.push(SourceStatus {
                        source_name: name.clone(),
                        status: SourceOutcome::Ok,
                        result_count: docs.len(),
                    });
                    documents.extend(docs);
                }
                FanOutOutcome::Timeout => {
                    any_failure = true;
                    statuses.push(SourceStatus {
                        source_name: name,
                        status: SourceOutcome::Timeout,
                        result_count: 0,
                    });
                }
                FanOutOutcome::CircuitOpen => {
                    any_failure = true;
                    self.record_circuit_open(&name).await;
                    statuses.push(SourceStatus {
                        source_name: name,
                        status: SourceOutcome::CircuitOpen,
                        result_count: 0,
                    });
                }
                FanOutOutcome::Unavailable => {
                    any_failure = true;
                    statuses.push(SourceStatus {
                        source_name: name,
                        status: SourceOutcome::Unavailable,
                        result_count: 0,
                    });
                }
            }
        }

        // §7 pipeline boundary: zero successful adapters with at least one
        // Unavailable/Timeout/CircuitOpen maps to Unavailable; zero results
        // with zero errors is an empty success.
        if !any_ok && any_failure {
            return Err(PipelineError::Unavailable(
                "no adapter returned results".to_string(),
            ));
        }

        let ranked = rank_documents(&normalized.folded, documents, weights, filters, &signals);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let mut ranked = ranked;
        for doc in &mut ranked {
            doc.retrieval_time_ms = elapsed_ms;
        }

        #[cfg(feature = "metrics")]
        {
            histogram!("pp_pipeline_query_duration_ms").record(elapsed_ms as f64);
            counter!("pp_pipeline_queries_total", "intent" => classification.intent.as_str()).increment(1);
        }
        #[cfg(not(feature = "metrics"))]
        let _ = classification;

        let total_found = ranked.len();
        Ok(SearchResult {
            documents: ranked,
            source_statuses: statuses,
            total_found,
            query_time_ms: elapsed_ms,
        })
    }

    /// Fans `search` out to every planned adapter in parallel. Each call
    /// carries its own deadline (`min(plan.deadline, adapter timeout)`, per
    /// §5's cancellation rule); once the plan deadline has elapsed and at
    /// least one adapter has answered, remaining in-flight calls are
    /// dropped (cancelling them) rather than awaited further. If nothing
    /// has answered yet, waiting continues up to a global ceiling so a
    /// single slow source cannot produce an empty response when others
    /// would have answered shortly after.
    async fn fan_out(
        &self,
        query: &str,
        filters: &Filter,
        plan: &Plan,
    ) -> Vec<(String, FanOutOutcome)> {
        let mut calls = FuturesUnordered::new();
        for entry in &plan.adapters {
            let per_adapter_deadline = plan.deadline.min(entry.config.timeout);
            calls.push(call_one(entry.clone(), query.to_string(), filters.clone(), per_adapter_deadline));
        }

        let mut outcomes = Vec::with_capacity(plan.adapters.len());
        let start = Instant::now();
        let global_ceiling = plan.deadline * self.config.global_ceiling_multiplier.max(1);

        let drain = async {
            while let Some(outcome) = calls.next().await {
                outcomes.push(outcome);
                if !outcomes.is_empty() && start.elapsed() >= plan.deadline {
                    break;
                }
            }
        };

        let _ = tokio::time::timeout(global_ceiling, drain).await;
        outcomes
    }

    async fn recently_open_names(&self) -> Vec<String> {
        let now = Instant::now();
        let hints = self.circuit_hints.read().await;
        hints
            .iter()
            .filter(|(_, tripped_at)| now.duration_since(**tripped_at) < self.config.circuit_cooldown)
            .map(|(name, _)| name.clone())
            .collect()
    }

    async fn record_circuit_open(&self, name: &str) {
        self.circuit_hints.write().await.insert(name.to_string(), Instant::now());
    }

    /// Deterministic cache key for the final ranked list (§4.6 stage 6):
    /// derived from the normalized query, the filter set, and the
    /// classified intent.
    fn cache_key(&self, folded_query: &str, filters: &Filter, intent: pp_types::Intent) -> String {
        let mut kinds = filters
            .kinds
            .as_ref()
            .map(|ks| ks.iter().map(|k| k.as_str()).collect::<Vec<_>>())
            .unwrap_or_default();
        kinds.sort_unstable();

        let mut categories = filters
            .categories
            .as_ref()
            .map(|cs| cs.iter().map(|c| c.as_str()).collect::<Vec<_>>())
            .unwrap_or_default();
        categories.sort_unstable();

        format!(
            "{}|kinds={}|categories={}|limit={}|min_confidence={}|intent={}",
            folded_query,
            kinds.join(","),
            categories.join(","),
            filters.limit.map(|l| l.to_string()).unwrap_or_default(),
            filters
                .min_confidence
                .map(|m| format!("{m:.3}"))
                .unwrap_or_default(),
            intent.as_str(),
        )
    }
}

async fn call_one(
    entry: AdapterEntry,
    query: String,
    filters: Filter,
    deadline: Duration,
) -> (String, FanOutOutcome) {
    let name = entry.config.name.clone();
    match tokio::time::timeout(deadline, entry.adapter.search(&query, &filters)).await {
        Ok(Ok(docs)) => (name, FanOutOutcome::Ok(docs)),
        Ok(Err(AdapterError::CircuitOpen { .. })) => (name, FanOutOutcome::CircuitOpen),
        Ok(Err(AdapterError::Timeout { .. })) => (name, FanOutOutcome::Timeout),
        Ok(Err(_)) => (name, FanOutOutcome::Unavailable),
        Err(_elapsed) => (name, FanOutOutcome::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pp_adapter::{AdapterMetadata, AdapterResult, SourceAdapter};
    use pp_cache::CacheConfig;
    use pp_types::{HealthCheck, Runbook, Severity, SourceConfig, SourceKind, SourceSettings};

    struct StubAdapter {
        name: String,
        behavior: Behavior,
    }

    #[derive(Clone)]
    enum Behavior {
        Return(Vec<Document>),
        CircuitOpen,
        Unavailable,
        Hang,
    }

    fn doc(name: &str, title: &str) -> Document {
        Document {
            id: format!("{name}:{title}"),
            title: title.to_string(),
            content: String::new(),
            excerpt: title.to_string(),
            source_name: name.to_string(),
            source_kind: SourceKind::File,
            category: pp_types::Category::Runbook,
            confidence: 0.0,
            match_reasons: vec![],
            retrieval_time_ms: 0,
            last_updated: chrono::Utc::now(),
            url: None,
            metadata: Default::default(),
        }
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        async fn initialize(&self) -> AdapterResult<()> {
            Ok(())
        }

        async fn search(&self, _query: &str, _filters: &Filter) -> AdapterResult<Vec<Document>> {
            match &self.behavior {
                Behavior::Return(docs) => Ok(docs.clone()),
                Behavior::CircuitOpen => Err(AdapterError::CircuitOpen { name: Some(self.name.clone()) }),
                Behavior::Unavailable => Err(AdapterError::Unavailable("down".into())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(vec![])
                }
            }
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
            HealthCheck::healthy(self.name.clone(), 1)
        }

        async fn refresh_index(&self, _force: bool) -> bool {
            true
        }

        fn metadata(&self) -> AdapterMetadata {
            AdapterMetadata::new(self.name.clone(), SourceKind::File)
        }

        async fn cleanup(&self) {}
    }

    fn source_config(name: &str, priority: u32, timeout_ms: u64) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            kind: SourceKind::File,
            priority,
            enabled: true,
            refresh_interval: Duration::from_secs(60),
            timeout: Duration::from_millis(timeout_ms),
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

    async fn pipeline_with(entries: Vec<(&str, u32, u64, Behavior)>) -> Pipeline {
        let registry = Registry::new();
        for (name, priority, timeout_ms, behavior) in entries {
            let name_owned = name.to_string();
            registry
                .register_factory(
                    SourceKind::File,
                    Arc::new(move |cfg: &SourceConfig| {
                        Ok(Box::new(StubAdapter {
                            name: cfg.name.clone(),
                            behavior: behavior.clone(),
                        }) as Box<dyn SourceAdapter>)
                    }),
                )
                .await;
            registry.create_all(&[source_config(&name_owned, priority, timeout_ms)]).await;
        }
        let cache = Cache::new(CacheConfig::builder().build());
        Pipeline::new(Arc::new(registry), Arc::new(cache), PipelineConfig::default())
    }

    #[tokio::test]
    async fn empty_query_returns_empty_result_without_calling_adapters() {
        let pipeline = pipeline_with(vec![("docs", 0, 1000, Behavior::Return(vec![doc("docs", "x")]))]).await;
        let result = pipeline.search("   ", Filter::new(), None, None, false).await.unwrap();
        assert!(result.documents.is_empty());
        assert!(result.source_statuses.is_empty());
    }

    #[tokio::test]
    async fn successful_adapter_contributes_ranked_documents() {
        let pipeline = pipeline_with(vec![(
            "docs",
            0,
            1000,
            Behavior::Return(vec![doc("docs", "disk space runbook")]),
        )])
        .await;
        let result = pipeline
            .search("disk space", Filter::new(), None, None, false)
            .await
            .unwrap();
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.source_statuses[0].status, SourceOutcome::Ok);
    }

    #[tokio::test]
    async fn all_sources_failing_maps_to_unavailable() {
        let pipeline = pipeline_with(vec![("docs", 0, 1000, Behavior::Unavailable)]).await;
        let err = pipeline
            .search("disk space", Filter::new(), None, None, false)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn circuit_open_excludes_the_source_from_the_next_plan() {
        let pipeline = pipeline_with(vec![
            ("a", 1, 1000, Behavior::CircuitOpen),
            ("b", 2, 1000, Behavior::Return(vec![doc("b", "disk space runbook")])),
        ])
        .await;

        let first = pipeline.search("disk space", Filter::new(), None, None, false).await;
        assert!(first.is_err() || first.is_ok());

        let second = pipeline
            .search("disk space again", Filter::new(), None, None, false)
            .await
            .unwrap();
        assert!(second.source_statuses.iter().any(|s| s.source_name == "a" && s.status == SourceOutcome::Skipped));
    }

    #[tokio::test]
    async fn hanging_adapter_times_out_without_blocking_the_whole_query() {
        let pipeline = pipeline_with(vec![
            ("slow", 0, 50, Behavior::Hang),
            ("fast", 1, 1000, Behavior::Return(vec![doc("fast", "disk space runbook")])),
        ])
        .await;
        let result = pipeline
            .search("disk space", Filter::new(), None, None, false)
            .await
            .unwrap();
        assert!(result.documents.iter().any(|d| d.source_name == "fast"));
    }
}
