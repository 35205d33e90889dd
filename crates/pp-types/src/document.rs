//! Normalized retrieved items (§3 `Document`/`SearchResult`).

use crate::source::SourceKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse classification of a retrieved item, used for filtering and for
/// the pipeline's metadata scoring component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Runbook,
    Procedure,
    DecisionTree,
    Guide,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Runbook => "runbook",
            Category::Procedure => "procedure",
            Category::DecisionTree => "decision_tree",
            Category::Guide => "guide",
            Category::General => "general",
        }
    }
}

/// A single retrieved item, normalized across every adapter kind.
///
/// `confidence` is set by the adapter (or the pipeline's ranking stage for
/// aggregated results) and must increase monotonically with observed match
/// strength; `retrieval_time_ms` is always stamped by the pipeline just
/// before the result is returned, never by the adapter that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Globally unique, adapter-scoped id (e.g. `"file:rb-disk-space.md"`).
    pub id: String,
    pub title: String,
    /// Full content; adapters may truncate very large documents.
    pub content: String,
    pub excerpt: String,
    pub source_name: String,
    pub source_kind: SourceKind,
    pub category: Category,
    pub confidence: f64,
    pub match_reasons: Vec<String>,
    pub retrieval_time_ms: u64,
    pub last_updated: chrono::DateTime<chrono::Utc>,
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Clamps `confidence` into `[0, 1]`; adapters sometimes compute a raw
    /// fuzzy score that can stray slightly outside that range.
    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 1.0);
    }
}

/// The result list a pipeline invocation returns: an ordered sequence of
/// [`Document`]s plus the per-source status summary the pipeline boundary
/// contract (§7) requires.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResult {
    pub documents: Vec<Document>,
    pub source_statuses: Vec<SourceStatus>,
    pub total_found: usize,
    pub query_time_ms: u64,
}

/// Per-source outcome of one fan-out, surfaced to callers so a degraded
/// source is visible rather than silently absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source_name: String,
    pub status: SourceOutcome,
    pub result_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOutcome {
    Ok,
    Unavailable,
    Timeout,
    CircuitOpen,
    Skipped,
}
