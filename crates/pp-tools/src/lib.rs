//! The tool layer (§4.7 C7).
//!
//! Exposes the seven stable-named operations of §6 as methods on [`Tools`],
//! a thin shaping layer over [`pp_pipeline::Pipeline`] (free-text search)
//! and [`pp_registry::Registry`] (structured runbook lookups, source
//! listing, feedback recording). None of these operations hold
//! long-lived state of their own beyond the feedback idempotency window;
//! everything else is delegated.

mod feedback;
mod knowledge;
mod runbooks;
mod sources;

pub use feedback::{FeedbackAnalysis, RecordFeedbackResult};
pub use knowledge::KnowledgeBaseResult;
pub use runbooks::{DecisionTreeResult, EscalationPathResult, ProcedureResult, RunbookSearchResult};
pub use sources::{ListSourcesResult, SourceSummary};

use pp_cache::Cache;
use pp_registry::Registry;
use pp_types::Runbook;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// The tool layer's error type is exactly the pipeline's: every tool
/// operation either succeeds, hits `NotFound`/`ValidationError` (surfaced
/// directly per §7's tool boundary policy), or propagates whatever the
/// pipeline/registry produced.
pub type ToolError = pp_pipeline::PipelineError;
pub type ToolResult<T> = Result<T, ToolError>;

/// Key identifying one feedback submission for the idempotency window:
/// `(incident_id, runbook_used)`.
pub(crate) type FeedbackKey = (String, Option<String>);

pub struct Tools {
    registry: Arc<Registry>,
    pipeline: Arc<pp_pipeline::Pipeline>,
    /// Caches `get_procedure`'s id-keyed runbook lookup under
    /// [`pp_cache::ContentType::Runbooks`]. The other three runbook
    /// operations (`search_runbooks`, `get_decision_tree`,
    /// `get_escalation_path`) key by free-text scenario/alert type rather
    /// than a stable id and are re-fanned-out on every call; this is the
    /// one runbook operation the orchestrator's startup cache warmer can
    /// usefully pre-populate from a seed list of runbook ids.
    runbook_cache: Arc<Cache<Runbook>>,
    feedback_seen: RwLock<HashMap<FeedbackKey, (Instant, RecordFeedbackResult)>>,
}

impl Tools {
    pub fn new(
        registry: Arc<Registry>,
        pipeline: Arc<pp_pipeline::Pipeline>,
        runbook_cache: Arc<Cache<Runbook>>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            runbook_cache,
            feedback_seen: RwLock::new(HashMap::new()),
        }
    }
}

fn validation_error(message: impl Into<String>) -> ToolError {
    ToolError::ValidationError(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pp_adapter::{AdapterError, AdapterMetadata, AdapterResult, SourceAdapter};
    use pp_cache::{Cache, CacheConfig};
    use pp_pipeline::{Pipeline, PipelineConfig};
    use pp_types::{
        Category, DecisionBranch, Document, EscalationLevel, EscalationPath, Filter, HealthCheck,
        ProcedureStep, Runbook, RunbookMetadata, Severity, SourceConfig, SourceKind, SourceSettings,
    };
    use std::time::Duration;

    struct StubAdapter {
        name: String,
        runbooks: Vec<Runbook>,
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
            alert_type: &str,
            _severity: Severity,
            _affected_systems: &[String],
            _context: Option<&str>,
        ) -> AdapterResult<Vec<Runbook>> {
            Ok(self
                .runbooks
                .iter()
                .filter(|rb| alert_type.is_empty() || rb.triggers.iter().any(|t| t.contains(alert_type)))
                .cloned()
                .collect())
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

    fn disk_space_runbook() -> Runbook {
        Runbook {
            id: "rb-disk-space".into(),
            title: "Disk space exhaustion".into(),
            version: "1".into(),
            triggers: vec!["disk_space".into()],
            severity_mapping: Default::default(),
            decision_tree: vec![
                DecisionBranch {
                    id: "root".into(),
                    question: "Is /tmp the largest consumer?".into(),
                    branches: HashMap::from([
                        ("yes".to_string(), "step-1".to_string()),
                        ("no".to_string(), "branch-2".to_string()),
                    ]),
                },
                DecisionBranch {
                    id: "branch-2".into(),
                    question: "Is it log rotation?".into(),
                    branches: HashMap::from([("yes".to_string(), "step-1".to_string())]),
                },
            ],
            procedures: vec![
                ProcedureStep {
                    id: "step-0".into(),
                    description: "Confirm the alert is still active".into(),
                    command: None,
                    expected_outcome: None,
                },
                ProcedureStep {
                    id: "step-1".into(),
                    description: "Free up /tmp".into(),
                    command: Some("rm -rf /tmp/*.log".into()),
                    expected_outcome: Some("disk usage drops below 80%".into()),
                },
            ],
            escalation_path: Some(EscalationPath {
                levels: vec![EscalationLevel {
                    level: 1,
                    role: "on-call".into(),
                    contact: "pagerduty:disk".into(),
                    wait_minutes: 15,
                }],
                communication_channels: vec!["#incidents".into()],
            }),
            metadata: RunbookMetadata {
                confidence: 0.9,
                success_rate: 0.8,
                avg_resolution_minutes: 12.0,
            },
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

    async fn tools_with_runbooks(runbooks: Vec<Runbook>) -> Tools {
        let registry = Registry::new();
        registry
            .register_factory(
                SourceKind::File,
                Arc::new(move |cfg: &SourceConfig| {
                    Ok(Box::new(StubAdapter {
                        name: cfg.name.clone(),
                        runbooks: runbooks.clone(),
                    }) as Box<dyn SourceAdapter>)
                }),
            )
            .await;
        registry.create_all(&[stub_config("docs")]).await;
        let registry = Arc::new(registry);
        let cache = Arc::new(Cache::new(CacheConfig::builder().build()));
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&registry),
            cache,
            PipelineConfig::default(),
        ));
        let runbook_cache = Arc::new(Cache::new(CacheConfig::builder().build()));
        Tools::new(registry, pipeline, runbook_cache)
    }

    #[tokio::test]
    async fn search_runbooks_finds_the_disk_space_runbook() {
        let tools = tools_with_runbooks(vec![disk_space_runbook()]).await;
        let result = tools
            .search_runbooks("disk_space", Severity::Critical, &[], None, None)
            .await
            .unwrap();
        assert_eq!(result.runbooks.len(), 1);
        assert!(result.runbooks[0].triggers.contains(&"disk_space".to_string()));
    }

    #[tokio::test]
    async fn search_runbooks_rejects_empty_alert_type() {
        let tools = tools_with_runbooks(vec![]).await;
        let err = tools
            .search_runbooks("", Severity::Low, &[], None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ValidationError(_)));
    }

    #[tokio::test]
    async fn get_decision_tree_truncates_to_max_depth() {
        let tools = tools_with_runbooks(vec![disk_space_runbook()]).await;
        let result = tools.get_decision_tree("disk_space", None, Some(1)).await.unwrap();
        assert_eq!(result.decision_tree.len(), 1);
        assert_eq!(result.decision_tree[0].id, "root");
    }

    #[tokio::test]
    async fn get_procedure_excludes_prerequisites_when_requested() {
        let tools = tools_with_runbooks(vec![disk_space_runbook()]).await;
        let full = tools.get_procedure("rb-disk-space", None, Some(true)).await.unwrap();
        assert_eq!(full.procedure.len(), 2);

        let trimmed = tools.get_procedure("rb-disk-space", None, Some(false)).await.unwrap();
        assert_eq!(trimmed.procedure.len(), 1);
        assert_eq!(trimmed.procedure[0].id, "step-1");
    }

    #[tokio::test]
    async fn get_procedure_not_found_for_unknown_id() {
        let tools = tools_with_runbooks(vec![disk_space_runbook()]).await;
        let err = tools.get_procedure("rb-missing", None, None).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound));
    }

    #[tokio::test]
    async fn get_escalation_path_returns_levels_for_matching_runbook() {
        let tools = tools_with_runbooks(vec![disk_space_runbook()]).await;
        let result = tools
            .get_escalation_path("disk_space", Severity::Critical, None, Some(20))
            .await
            .unwrap();
        assert_eq!(result.levels.len(), 1);
        assert!(!result.business_impact_assessment.is_empty());
    }

    #[tokio::test]
    async fn search_knowledge_base_filters_by_source_name() {
        let tools = tools_with_runbooks(vec![disk_space_runbook()]).await;
        let result = tools
            .search_knowledge_base("anything", Some(&["nonexistent".to_string()]), None, None, None)
            .await
            .unwrap();
        assert!(result.results.is_empty());
    }

    #[tokio::test]
    async fn list_sources_reports_every_registered_adapter() {
        let tools = tools_with_runbooks(vec![]).await;
        let result = tools.list_sources(Some(true), Some(false), None).await.unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.healthy, 1);
    }

    #[tokio::test]
    async fn record_resolution_feedback_is_idempotent_within_the_window() {
        let tools = tools_with_runbooks(vec![disk_space_runbook()]).await;
        let first = tools
            .record_resolution_feedback(
                "incident-1",
                Some("rb-disk-space".to_string()),
                10.0,
                true,
                "worked great".to_string(),
                None,
                "freed /tmp".to_string(),
            )
            .await
            .unwrap();
        let second = tools
            .record_resolution_feedback(
                "incident-1",
                Some("rb-disk-space".to_string()),
                10.0,
                true,
                "worked great".to_string(),
                None,
                "freed /tmp".to_string(),
            )
            .await
            .unwrap();
        assert_eq!(first.feedback_id, second.feedback_id);
        assert_eq!(tools.registry.feedback_stats("docs").await.unwrap().total, 1);
    }
}
