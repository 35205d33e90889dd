//! Stage 2 of §4.6: classify intent.
//!
//! Deterministic rule-based lexical matching over an operational
//! vocabulary, as the spec requires ("classifier is deterministic
//! rule-based first... with optional semantic augmentation" — no
//! embedding layer is wired up in this workspace, so augmentation is a
//! no-op and every classification is the rule-based result).

use pp_types::Intent;

/// One vocabulary entry: a lexical cue and the intent it votes for.
const VOCABULARY: &[(&str, Intent)] = &[
    ("emergency", Intent::EmergencyResponse),
    ("critical", Intent::EmergencyResponse),
    ("outage", Intent::EmergencyResponse),
    ("down", Intent::EmergencyResponse),
    ("sev1", Intent::EmergencyResponse),
    ("sev-1", Intent::EmergencyResponse),
    ("runbook", Intent::FindRunbook),
    ("run book", Intent::FindRunbook),
    ("playbook", Intent::FindRunbook),
    ("escalate", Intent::EscalationPath),
    ("escalation", Intent::EscalationPath),
    ("oncall", Intent::EscalationPath),
    ("on-call", Intent::EscalationPath),
    ("page", Intent::EscalationPath),
    ("procedure", Intent::GetProcedure),
    ("steps", Intent::GetProcedure),
    ("how to", Intent::GetProcedure),
    ("howto", Intent::GetProcedure),
    ("instructions", Intent::GetProcedure),
    ("troubleshoot", Intent::Troubleshoot),
    ("debug", Intent::Troubleshoot),
    ("diagnose", Intent::Troubleshoot),
    ("error", Intent::Troubleshoot),
    ("failing", Intent::Troubleshoot),
    ("status", Intent::StatusCheck),
    ("health", Intent::StatusCheck),
    ("is up", Intent::StatusCheck),
    ("uptime", Intent::StatusCheck),
    ("config", Intent::Configuration),
    ("configure", Intent::Configuration),
    ("setting", Intent::Configuration),
    ("parameter", Intent::Configuration),
];

/// Result of classifying one query.
#[derive(Debug, Clone)]
pub struct IntentClassification {
    pub intent: Intent,
    pub confidence: f64,
    pub expanded_keywords: Vec<String>,
}

/// Classifies `query` (already normalized/case-folded) plus optional
/// caller-supplied `context` into one [`Intent`]. Falls back to
/// [`Intent::GeneralSearch`] with a low confidence when no vocabulary
/// entry matches.
pub fn classify(query: &str, context: Option<&str>) -> IntentClassification {
    let haystack = match context {
        Some(ctx) => format!("{query} {}", ctx.to_lowercase()),
        None => query.to_string(),
    };

    let mut votes: Vec<(Intent, &'static str)> = Vec::new();
    for (cue, intent) in VOCABULARY {
        if haystack.contains(cue) {
            votes.push((*intent, cue));
        }
    }

    if votes.is_empty() {
        return IntentClassification {
            intent: Intent::GeneralSearch,
            confidence: 0.3,
            expanded_keywords: query.split_whitespace().map(str::to_string).collect(),
        };
    }

    let mut counts: Vec<(Intent, usize)> = Vec::new();
    for (intent, _) in &votes {
        match counts.iter_mut().find(|(i, _)| i == intent) {
            Some((_, n)) => *n += 1,
            None => counts.push((*intent, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let (winner, winning_votes) = counts[0];

    let confidence = (0.5 + 0.15 * winning_votes as f64).min(0.98);
    let expanded_keywords = votes
        .iter()
        .filter(|(i, _)| *i == winner)
        .map(|(_, cue)| cue.to_string())
        .collect();

    IntentClassification {
        intent: winner,
        confidence,
        expanded_keywords,
    }
}
