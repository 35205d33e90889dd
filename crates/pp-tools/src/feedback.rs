//! `record_resolution_feedback` (§6), the sole write path into adapter
//! success-rate stats (§4.7).

use crate::runbooks::fan_out_runbooks;
use crate::{validation_error, ToolResult, Tools};
use pp_types::Severity;
use std::time::{Duration, Instant};

/// §8's idempotence window: a duplicate `(incident_id, runbook_used)`
/// submission within this duration returns the original result without
/// recording a second feedback event.
const IDEMPOTENCY_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Persisted state is explicitly out of scope (§6), so `feedback` and
/// `root_cause` are accepted for the caller's own audit trail and folded
/// into this analysis summary rather than stored anywhere.
#[derive(Debug, Clone)]
pub struct FeedbackAnalysis {
    pub attributed_source: Option<String>,
    pub resolution_within_average: Option<bool>,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct RecordFeedbackResult {
    pub feedback_id: String,
    pub stored_at: chrono::DateTime<chrono::Utc>,
    pub analysis: FeedbackAnalysis,
}

impl Tools {
    pub async fn record_resolution_feedback(
        &self,
        incident_id: &str,
        runbook_used: Option<String>,
        resolution_time_minutes: f64,
        was_successful: bool,
        feedback: String,
        root_cause: Option<String>,
        resolution_summary: String,
    ) -> ToolResult<RecordFeedbackResult> {
        if incident_id.trim().is_empty() {
            return Err(validation_error("incident_id must not be empty"));
        }
        if resolution_summary.trim().is_empty() {
            return Err(validation_error("resolution_summary must not be empty"));
        }

        let key = (incident_id.to_string(), runbook_used.clone());
        let now = Instant::now();

        {
            let seen = self.feedback_seen.read().await;
            if let Some((recorded_at, result)) = seen.get(&key) {
                if now.duration_since(*recorded_at) < IDEMPOTENCY_WINDOW {
                    return Ok(result.clone());
                }
            }
        }

        let mut seen = self.feedback_seen.write().await;
        if let Some((recorded_at, result)) = seen.get(&key) {
            if now.duration_since(*recorded_at) < IDEMPOTENCY_WINDOW {
                return Ok(result.clone());
            }
        }

        let attributed_source = match &runbook_used {
            Some(runbook_id) => {
                let pairs = fan_out_runbooks(&self.registry, "", Severity::Low, &[], None).await;
                let owner = pairs
                    .into_iter()
                    .find(|(_, rb)| &rb.id == runbook_id)
                    .map(|(source, _)| source);
                if let Some(source) = &owner {
                    self.registry
                        .record_feedback(source, was_successful, resolution_time_minutes)
                        .await;
                }
                owner
            }
            None => None,
        };

        let resolution_within_average = match &attributed_source {
            Some(source) => self
                .registry
                .feedback_stats(source)
                .await
                .map(|stats| resolution_time_minutes <= stats.avg_resolution_minutes().max(1.0) * 1.5),
            None => None,
        };

        let outcome_word = if was_successful { "resolved" } else { "not resolved" };
        let mut summary = format!("{resolution_summary} ({outcome_word}, {feedback})");
        if let Some(cause) = &root_cause {
            summary.push_str(&format!("; root cause: {cause}"));
        }

        let result = RecordFeedbackResult {
            feedback_id: uuid::Uuid::new_v4().to_string(),
            stored_at: chrono::Utc::now(),
            analysis: FeedbackAnalysis {
                attributed_source,
                resolution_within_average,
                summary,
            },
        };

        seen.insert(key, (now, result.clone()));
        Ok(result)
    }
}
