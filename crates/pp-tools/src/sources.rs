//! `list_sources` (§6).

use crate::{ToolResult, Tools};
use pp_registry::FeedbackStats;
use pp_types::SourceKind;
use std::collections::HashMap;
use std::time::Duration;

/// Default budget for the per-source healthcheck fan-out this operation
/// triggers when `include_health` is requested.
const HEALTHCHECK_DEADLINE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub name: String,
    pub kind: SourceKind,
    pub priority: u32,
    pub document_count: usize,
    pub avg_response_time_ms: f64,
    /// `None` when `include_health` was not requested.
    pub healthy: Option<bool>,
    /// `None` when `include_stats` was not requested or no feedback has
    /// been recorded for this source yet.
    pub feedback: Option<FeedbackStats>,
}

#[derive(Debug, Clone)]
pub struct ListSourcesResult {
    pub sources: Vec<SourceSummary>,
    pub total: usize,
    pub healthy: usize,
}

impl Tools {
    /// Never fails: a registry with zero live adapters is a normal
    /// (empty) result, per §8's "zero healthy adapters → `list_sources`
    /// succeeds with empty `sources`".
    pub async fn list_sources(
        &self,
        include_health: Option<bool>,
        include_stats: Option<bool>,
        kind: Option<SourceKind>,
    ) -> ToolResult<ListSourcesResult> {
        let entries: Vec<_> = self
            .registry
            .snapshot()
            .await
            .into_iter()
            .filter(|entry| kind.map_or(true, |k| entry.config.kind == k))
            .collect();

        let health_by_name: HashMap<String, bool> = if include_health.unwrap_or(true) {
            self.registry
                .healthcheck_all(HEALTHCHECK_DEADLINE)
                .await
                .into_iter()
                .map(|check| (check.source_name, check.healthy))
                .collect()
        } else {
            HashMap::new()
        };

        let mut sources = Vec::with_capacity(entries.len());
        let mut healthy_count = 0;

        for entry in &entries {
            let metadata = entry.adapter.metadata();
            let healthy = health_by_name.get(&entry.config.name).copied();
            if healthy == Some(true) {
                healthy_count += 1;
            }

            let feedback = if include_stats.unwrap_or(false) {
                self.registry.feedback_stats(&entry.config.name).await
            } else {
                None
            };

            sources.push(SourceSummary {
                name: entry.config.name.clone(),
                kind: entry.config.kind,
                priority: entry.config.priority,
                document_count: metadata.document_count,
                avg_response_time_ms: metadata.avg_response_time_ms,
                healthy,
                feedback,
            });
        }

        Ok(ListSourcesResult {
            total: sources.len(),
            healthy: healthy_count,
            sources,
        })
    }
}
