//! Stage 3 of §4.6: plan.

use pp_registry::AdapterEntry;
use pp_types::{Filter, Intent};
use std::time::Duration;

/// Absolute cap on fanned-out adapters per invocation (§5 "bounded
/// parallelism... with an absolute cap of 16").
pub const MAX_FAN_OUT: usize = 16;

const CRITICAL_DEADLINE: Duration = Duration::from_millis(150);
const STANDARD_DEADLINE: Duration = Duration::from_millis(300);
const BULK_DEADLINE: Duration = Duration::from_millis(1000);

/// The outcome of the plan stage: the deadline this invocation gets and
/// the ordered set of adapters selected to receive the query.
#[derive(Debug, Clone)]
pub struct Plan {
    pub deadline: Duration,
    pub adapters: Vec<AdapterEntry>,
    /// Adapters that were excluded because their circuit breaker was
    /// recently observed open, surfaced so the caller can report them
    /// as `Skipped` rather than silently dropping them.
    pub skipped_circuit_open: Vec<String>,
}

/// Picks the plan deadline for a classified intent (§4.6 stage 3), then
/// clamps it to the caller's own deadline if one was supplied.
pub fn deadline_for(intent: Intent, caller_deadline: Option<Duration>) -> Duration {
    let tier = if intent.is_critical() {
        CRITICAL_DEADLINE
    } else if intent.is_bulk() {
        BULK_DEADLINE
    } else {
        STANDARD_DEADLINE
    };
    match caller_deadline {
        Some(d) => tier.min(d),
        None => tier,
    }
}

/// Selects adapters for one invocation: filters by `filters.kinds`, excludes
/// adapters whose breaker was recently observed open (unless
/// `allow_degraded`), sorts by ascending priority, and caps the result at
/// [`MAX_FAN_OUT`].
pub fn select_adapters(
    snapshot: Vec<AdapterEntry>,
    filters: &Filter,
    recently_open: &[String],
    allow_degraded: bool,
) -> (Vec<AdapterEntry>, Vec<String>) {
    let mut eligible = Vec::new();
    let mut skipped = Vec::new();

    for entry in snapshot {
        if !filters.allows_kind(entry.config.kind) {
            continue;
        }
        if !allow_degraded && recently_open.iter().any(|n| n == &entry.config.name) {
            skipped.push(entry.config.name.clone());
            continue;
        }
        eligible.push(entry);
    }

    eligible.sort_by_key(|e| e.config.priority);
    eligible.truncate(MAX_FAN_OUT);

    (eligible, skipped)
}
