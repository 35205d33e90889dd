//! Stage 1 of §4.6: normalize.

/// A query after normalization: the original text (kept for display) and a
/// case-folded, control-character-free form used for matching.
#[derive(Debug, Clone)]
pub struct NormalizedQuery {
    pub original: String,
    pub folded: String,
}

/// Trims, case-folds, and strips control characters from `raw`. Returns
/// `None` for an empty (or all-control/whitespace) query — the caller must
/// short-circuit to an empty result without invoking any adapter, per
/// §4.6 stage 1's "empty input → empty result (no adapter calls)".
pub fn normalize(raw: &str) -> Option<NormalizedQuery> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned: String = trimmed.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        return None;
    }
    let folded = cleaned.to_lowercase();

    Some(NormalizedQuery {
        original: cleaned,
        folded,
    })
}
