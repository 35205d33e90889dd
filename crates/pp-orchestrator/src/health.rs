//! The Health / Metrics Aggregator (§4.8, C8): rolls the four tracked
//! components up into one [`pp_health::OverallHealth`] via
//! [`pp_health::ComponentHealth`].
//!
//! This module only computes the rollup; the per-component probes
//! (`cache_healthy`, `sources_healthy`) live here because they need direct
//! access to the orchestrator's own [`pp_cache::Cache`] and
//! [`pp_registry::Registry`] handles, not because the rollup math differs
//! from what [`pp_health::rollup`] already provides.

use crate::Orchestrator;
use pp_health::{sources_component_healthy, ComponentHealth, OverallHealth};
use std::collections::HashMap;
use std::time::Duration;

/// A point-in-time health snapshot, shaped for a healthcheck endpoint or the
/// CLI's `healthcheck` subcommand.
#[derive(Debug, Clone, Copy)]
pub struct HealthReport {
    pub components: ComponentHealth,
    pub overall: OverallHealth,
}

impl HealthReport {
    pub fn exit_code(&self) -> i32 {
        self.overall.exit_code()
    }
}

/// A source counts as critical-priority if it is the highest-priority
/// source configured (`priority == 0`), per rank.rs's "lower number sorts
/// first" convention — an Open Question the spec left undecided (§9).
const CRITICAL_PRIORITY: u32 = 0;

impl Orchestrator {
    /// Computes the current system health by probing the cache, fanning
    /// healthchecks out across the registry, and consulting the rolling
    /// performance window. `deadline` bounds only the source healthcheck
    /// fan-out (§4.8's "sources: registry fan-out").
    pub async fn health(&self, deadline: Duration) -> HealthReport {
        let cache_healthy = self.cache_healthy();

        let entries = self.registry.snapshot().await;
        let enabled_count = entries.len();
        let checks = self.registry.healthcheck_all(deadline).await;
        let healthy_by_name: HashMap<String, bool> =
            checks.iter().map(|c| (c.source_name.clone(), c.healthy)).collect();

        let healthy_count = checks.iter().filter(|c| c.healthy).count();
        let any_critical_source_healthy = entries.iter().any(|e| {
            e.config.priority == CRITICAL_PRIORITY
                && healthy_by_name.get(&e.config.name).copied().unwrap_or(false)
        });
        let sources_healthy =
            sources_component_healthy(healthy_count, enabled_count, any_critical_source_healthy);

        let components = ComponentHealth {
            mcp_server_ready: self.accepting_traffic(),
            cache_healthy,
            sources_healthy,
            performance_healthy: self.performance.is_healthy(),
        };

        HealthReport {
            components,
            overall: components.overall(),
        }
    }

    /// L1 is always in-process and available; the only way this component
    /// goes unhealthy is a configured, enabled L2 backend that has lost its
    /// connection. A `hybrid` cache in that state still serves requests
    /// from L1 alone (§8: "degrades to L1 only"), but this flag mirrors the
    /// connectivity leg of §4.8's "cache" component so a `degraded` rollup
    /// traces back to a cause.
    fn cache_healthy(&self) -> bool {
        if !self.config.cache.distributed.enabled {
            return true;
        }
        self.cache.stats().l2_connected
    }
}
