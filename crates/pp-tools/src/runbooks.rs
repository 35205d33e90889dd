//! `search_runbooks`, `get_decision_tree`, `get_procedure`,
//! `get_escalation_path` (§6).
//!
//! These four operations need the adapter's typed `Runbook` shape, not the
//! generic `Document` the retrieval pipeline ranks — so unlike
//! [`crate::knowledge::search_knowledge_base`], they fan out directly to
//! [`pp_adapter::SourceAdapter::search_runbooks`] across the registry's
//! snapshot rather than going through `pp_pipeline::Pipeline`.

use crate::{validation_error, ToolError, ToolResult, Tools};
use pp_cache::ContentType;
use pp_registry::Registry;
use pp_types::{DecisionBranch, ProcedureStep, Runbook, Severity};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Per-adapter timeout for the runbook fan-out calls this module makes;
/// kept short since these are interactive, not bulk, operations.
const FAN_OUT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RunbookSearchResult {
    pub runbooks: Vec<Runbook>,
    pub total_found: usize,
    pub retrieval_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DecisionTreeResult {
    pub decision_tree: Vec<DecisionBranch>,
    pub confidence: f64,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct ProcedureResult {
    pub procedure: Vec<ProcedureStep>,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct EscalationPathResult {
    pub levels: Vec<pp_types::EscalationLevel>,
    pub business_impact_assessment: String,
    pub communication_channels: Vec<String>,
}

/// `get_procedure`'s cache loader error: no live adapter returned a runbook
/// matching the requested id. Never cached, so a later `create_all` or
/// `refresh_index` that makes the id resolvable isn't shadowed by a stale
/// miss.
#[derive(Debug)]
struct RunbookNotFound;

impl std::fmt::Display for RunbookNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no adapter returned a matching runbook")
    }
}

impl std::error::Error for RunbookNotFound {}

/// Calls `search_runbooks` on every live adapter in parallel, tagging each
/// result with the adapter name it came from (needed to attribute
/// `record_resolution_feedback` to the right source). Per-adapter errors
/// and timeouts are dropped silently, matching §7's registry-boundary
/// policy: "per-adapter errors never fail the registry call."
pub(crate) async fn fan_out_runbooks(
    registry: &Registry,
    alert_type: &str,
    severity: Severity,
    affected_systems: &[String],
    context: Option<&str>,
) -> Vec<(String, Runbook)> {
    let entries = registry.snapshot().await;
    let calls = entries.into_iter().map(|entry| {
        let alert_type = alert_type.to_string();
        let affected = affected_systems.to_vec();
        let context = context.map(str::to_string);
        async move {
            let name = entry.config.name.clone();
            let deadline = FAN_OUT_TIMEOUT.min(entry.config.timeout);
            match tokio::time::timeout(
                deadline,
                entry
                    .adapter
                    .search_runbooks(&alert_type, severity, &affected, context.as_deref()),
            )
            .await
            {
                Ok(Ok(runbooks)) => runbooks.into_iter().map(|rb| (name.clone(), rb)).collect(),
                _ => Vec::new(),
            }
        }
    });
    futures::future::join_all(calls).await.into_iter().flatten().collect()
}

/// Keeps the highest-confidence copy of each runbook id, since more than
/// one adapter can legitimately answer the same `alert_type`.
fn dedupe_by_id(pairs: Vec<(String, Runbook)>) -> Vec<(String, Runbook)> {
    let mut by_id: HashMap<String, (String, Runbook)> = HashMap::new();
    for (source, runbook) in pairs {
        match by_id.get(&runbook.id) {
            Some((_, existing)) if existing.metadata.confidence >= runbook.metadata.confidence => {}
            _ => {
                by_id.insert(runbook.id.clone(), (source, runbook));
            }
        }
    }
    by_id.into_values().collect()
}

/// Follows `decision_tree`'s branch graph breadth-first from its first
/// node, up to `max_depth` hops, returning only the visited branches —
/// the graph-shaped analogue of the pipeline's `limit` truncation.
fn truncate_decision_tree(tree: &[DecisionBranch], max_depth: usize) -> Vec<DecisionBranch> {
    let Some(root) = tree.first() else {
        return Vec::new();
    };
    let by_id: HashMap<&str, &DecisionBranch> = tree.iter().map(|b| (b.id.as_str(), b)).collect();

    let mut visited = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(root.id.clone());
    let mut frontier = vec![root.id.clone()];

    for _ in 0..max_depth.max(1) {
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for id in frontier {
            let Some(branch) = by_id.get(id.as_str()) else {
                continue;
            };
            visited.push((*branch).clone());
            for target in branch.branches.values() {
                if by_id.contains_key(target.as_str()) && seen.insert(target.clone()) {
                    next.push(target.clone());
                }
            }
        }
        frontier = next;
    }
    visited
}

fn assess_business_impact(
    severity: Severity,
    business_impact: Option<&str>,
    time_since_start_minutes: Option<u64>,
) -> String {
    if let Some(stated) = business_impact {
        return stated.to_string();
    }
    let elapsed = time_since_start_minutes.unwrap_or(0);
    match severity {
        Severity::Critical if elapsed >= 30 => {
            "severe, prolonged outage affecting critical systems".to_string()
        }
        Severity::Critical => "severe impact, immediate attention required".to_string(),
        Severity::High if elapsed >= 60 => "significant impact, extended duration".to_string(),
        Severity::High => "significant impact".to_string(),
        Severity::Medium => "moderate impact".to_string(),
        Severity::Low => "minimal impact".to_string(),
    }
}

impl Tools {
    pub async fn search_runbooks(
        &self,
        alert_type: &str,
        severity: Severity,
        affected_systems: &[String],
        context: Option<&str>,
        limit: Option<usize>,
    ) -> ToolResult<RunbookSearchResult> {
        if alert_type.trim().is_empty() {
            return Err(validation_error("alert_type must not be empty"));
        }

        let start = Instant::now();
        let pairs = fan_out_runbooks(&self.registry, alert_type, severity, affected_systems, context).await;
        let mut runbooks: Vec<Runbook> = dedupe_by_id(pairs).into_iter().map(|(_, rb)| rb).collect();
        runbooks.sort_by(|a, b| {
            b.metadata
                .confidence
                .partial_cmp(&a.metadata.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total_found = runbooks.len();
        runbooks.truncate(limit.unwrap_or(5));

        Ok(RunbookSearchResult {
            runbooks,
            total_found,
            retrieval_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    pub async fn get_decision_tree(
        &self,
        scenario: &str,
        context: Option<&str>,
        max_depth: Option<usize>,
    ) -> ToolResult<DecisionTreeResult> {
        if scenario.trim().is_empty() {
            return Err(validation_error("scenario must not be empty"));
        }

        let pairs = fan_out_runbooks(&self.registry, scenario, Severity::Low, &[], context).await;
        let best = dedupe_by_id(pairs).into_iter().max_by(|a, b| {
            a.1.metadata
                .confidence
                .partial_cmp(&b.1.metadata.confidence)
                .unwrap_or(Ordering::Equal)
        });

        let Some((source, runbook)) = best else {
            return Err(ToolError::NotFound);
        };

        let tree = truncate_decision_tree(&runbook.decision_tree, max_depth.unwrap_or(5));
        Ok(DecisionTreeResult {
            decision_tree: tree,
            confidence: runbook.metadata.confidence,
            source,
        })
    }

    pub async fn get_procedure(
        &self,
        procedure_id: &str,
        context: Option<&str>,
        include_prerequisites: Option<bool>,
    ) -> ToolResult<ProcedureResult> {
        if procedure_id.trim().is_empty() {
            return Err(validation_error("procedure_id must not be empty"));
        }

        // The only runbook operation keyed by a stable id rather than
        // free-text, so it's the one the orchestrator's startup warmer can
        // usefully pre-populate from a seed list of runbook ids.
        let loaded = self
            .runbook_cache
            .get_or_load(ContentType::Runbooks, procedure_id, || async {
                let pairs = fan_out_runbooks(&self.registry, "", Severity::Low, &[], context).await;
                pairs
                    .into_iter()
                    .find(|(_, rb)| rb.id == procedure_id)
                    .map(|(_, rb)| rb)
                    .ok_or(RunbookNotFound)
            })
            .await;

        let Ok(runbook) = loaded else {
            return Err(ToolError::NotFound);
        };

        let steps = if include_prerequisites.unwrap_or(true) {
            runbook.procedures
        } else {
            let first_actionable = runbook
                .procedures
                .iter()
                .position(|s| s.command.is_some())
                .unwrap_or(0);
            runbook.procedures[first_actionable..].to_vec()
        };

        Ok(ProcedureResult {
            procedure: steps,
            confidence: runbook.metadata.confidence,
        })
    }

    pub async fn get_escalation_path(
        &self,
        incident_type: &str,
        severity: Severity,
        business_impact: Option<&str>,
        time_since_start_minutes: Option<u64>,
    ) -> ToolResult<EscalationPathResult> {
        if incident_type.trim().is_empty() {
            return Err(validation_error("incident_type must not be empty"));
        }

        let pairs = fan_out_runbooks(&self.registry, incident_type, severity, &[], None).await;
        let matched = pairs
            .into_iter()
            .filter_map(|(_, rb)| rb.escalation_path.clone().map(|path| (rb.metadata.confidence, path)))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let Some((_, path)) = matched else {
            return Err(ToolError::NotFound);
        };

        Ok(EscalationPathResult {
            levels: path.levels,
            business_impact_assessment: assess_business_impact(severity, business_impact, time_since_start_minutes),
            communication_channels: path.communication_channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(id: &str, targets: &[(&str, &str)]) -> DecisionBranch {
        DecisionBranch {
            id: id.to_string(),
            question: "q".to_string(),
            branches: targets.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn truncate_decision_tree_stops_at_max_depth() {
        let tree = vec![
            branch("a", &[("x", "b")]),
            branch("b", &[("x", "c")]),
            branch("c", &[]),
        ];
        let truncated = truncate_decision_tree(&tree, 2);
        let ids: Vec<&str> = truncated.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn truncate_decision_tree_handles_empty_tree() {
        assert!(truncate_decision_tree(&[], 5).is_empty());
    }

    #[test]
    fn assess_business_impact_prefers_stated_value() {
        assert_eq!(
            assess_business_impact(Severity::Low, Some("custom note"), None),
            "custom note"
        );
    }
}
