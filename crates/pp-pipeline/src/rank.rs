//! Stage 5 of §4.6: rank.

use pp_types::{Document, Filter};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Hybrid scoring weights: `score = w_s·semantic + w_f·lexical + w_m·metadata`.
#[derive(Debug, Clone, Copy)]
pub struct RankWeights {
    pub semantic: f64,
    pub lexical: f64,
    pub metadata: f64,
}

impl Default for RankWeights {
    /// `(0.6, 0.3, 0.1)`, the default weights of §4.6 stage 5.
    fn default() -> Self {
        Self {
            semantic: 0.6,
            lexical: 0.3,
            metadata: 0.1,
        }
    }
}

/// Per-source signals the metadata component blends in, gathered from the
/// plan's adapter snapshot rather than recomputed per document.
#[derive(Debug, Default)]
pub struct SourceSignals {
    pub priority: HashMap<String, u32>,
    pub success_rate: HashMap<String, f64>,
}

/// Normalized fuzzy lexical score in `[0, 1]`, the same heuristic adapters
/// use for their own in-memory scans (grounded in `strsim::jaro_winkler`).
fn lexical_score(query: &str, candidate: &str) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    strsim::jaro_winkler(query, &candidate.to_lowercase())
}

/// Recency component: decays from 1.0 at `now` with roughly a one-month
/// half-life, so a document updated today outranks a stale one at equal
/// lexical match.
fn recency_score(last_updated: chrono::DateTime<chrono::Utc>) -> f64 {
    let age_seconds = (chrono::Utc::now() - last_updated).num_seconds().max(0) as f64;
    let age_days = age_seconds / 86_400.0;
    (-age_days / 30.0).exp()
}

/// No embedding layer is wired into this workspace, so the semantic
/// component is always `0.0` — ranking degrades gracefully to lexical +
/// metadata only, exactly as §4.6 stage 5 describes ("`semantic` is cosine
/// similarity from the embedding layer (if enabled; else 0)").
fn semantic_score(_query: &str, _doc: &Document) -> f64 {
    0.0
}

/// Scores, filters, and sorts `docs` per §4.6 stage 5. `query` must already
/// be normalized/case-folded.
pub fn rank(
    query: &str,
    docs: Vec<Document>,
    weights: RankWeights,
    filters: &Filter,
    signals: &SourceSignals,
) -> Vec<Document> {
    let mut docs = docs;

    for doc in &mut docs {
        let candidate = format!("{} {}", doc.title, doc.excerpt);
        let lexical = lexical_score(query, &candidate);
        let semantic = semantic_score(query, doc);

        let priority = signals
            .priority
            .get(&doc.source_name)
            .copied()
            .unwrap_or(u32::MAX / 2);
        let priority_score = 1.0 / (1.0 + priority as f64);
        let success_rate = signals
            .success_rate
            .get(&doc.source_name)
            .copied()
            .unwrap_or(1.0);
        let recency = recency_score(doc.last_updated);
        let metadata = 0.5 * recency + 0.3 * priority_score + 0.2 * success_rate;

        doc.confidence = weights.semantic * semantic + weights.lexical * lexical + weights.metadata * metadata;
        doc.clamp_confidence();
    }

    if let Some(min_confidence) = filters.min_confidence {
        docs.retain(|d| d.confidence >= min_confidence);
    }

    docs.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let pa = signals.priority.get(&a.source_name).copied().unwrap_or(u32::MAX);
                let pb = signals.priority.get(&b.source_name).copied().unwrap_or(u32::MAX);
                pa.cmp(&pb)
            })
            .then_with(|| b.last_updated.cmp(&a.last_updated))
            .then_with(|| a.id.cmp(&b.id))
    });

    if let Some(limit) = filters.limit {
        docs.truncate(limit);
    }

    docs
}
