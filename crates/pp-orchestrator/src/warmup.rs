//! Cache warming (§4.2, §4.9): "on startup, after a configurable delay, the
//! orchestrator invokes warmers for content types with `warmup=true`, using
//! a critical-runbook seed list supplied by the tool layer."
//!
//! The only content type the tool layer can seed today is `runbooks` — it's
//! the one runbook operation (`get_procedure`) that is keyed by a stable id
//! rather than free text, and therefore the only one `get_or_load` can
//! usefully pre-populate (see [`pp_tools::Tools`]'s `runbook_cache` field).

use pp_cache::ContentType;
use pp_tools::Tools;
use std::sync::Arc;
use std::time::Duration;

/// Runbook ids warmed at startup when `cache.content_types.runbooks.warmup`
/// is set. A fixed seed rather than a discovered one — the tool layer has no
/// standing notion of "criticality" beyond what an operator names here.
pub const CRITICAL_RUNBOOK_SEEDS: &[&str] = &["rb-critical-1", "rb-critical-2"];

/// Spawns the warmup task; returns immediately. The task sleeps `delay`,
/// then calls `get_procedure` once per seed id so each lands in
/// `ContentType::Runbooks`' L1 with a fresh TTL. Misses (a seed id with no
/// matching adapter) are logged and skipped — warmup never fails startup.
pub fn schedule(tools: Arc<Tools>, warmup_content_types: Vec<ContentType>, delay: Duration) {
    if !warmup_content_types.contains(&ContentType::Runbooks) {
        return;
    }

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        for id in CRITICAL_RUNBOOK_SEEDS {
            if let Err(_err) = tools.get_procedure(id, None, None).await {
                #[cfg(feature = "tracing")]
                tracing::warn!(runbook_id = %id, error = %_err, "cache warmup could not resolve seed runbook");
            }
        }
    });
}
