//! System-wide health rollup: combines independently-tracked component
//! health (server readiness, cache, source registry, performance) into the
//! three-tier status a healthcheck endpoint or CLI reports.

/// Overall system health after combining all tracked components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

impl OverallHealth {
    /// Exit code the CLI's `healthcheck` subcommand reports for this status.
    ///
    /// `Healthy` and `Degraded` both exit `0` — the caller asked whether the
    /// system is *usable*, not whether it is at peak performance; only
    /// `Unhealthy` (or a deadline blown entirely) earns exit code `3`.
    pub fn exit_code(&self) -> i32 {
        match self {
            OverallHealth::Healthy | OverallHealth::Degraded => 0,
            OverallHealth::Unhealthy => 3,
        }
    }
}

/// Snapshot of the four components the aggregator rolls up.
#[derive(Debug, Clone, Copy)]
pub struct ComponentHealth {
    pub mcp_server_ready: bool,
    pub cache_healthy: bool,
    pub sources_healthy: bool,
    pub performance_healthy: bool,
}

impl ComponentHealth {
    /// Percentage of the four tracked components currently healthy, in `[0, 100]`.
    pub fn health_percent(&self) -> u8 {
        let healthy_count = [
            self.mcp_server_ready,
            self.cache_healthy,
            self.sources_healthy,
            self.performance_healthy,
        ]
        .iter()
        .filter(|&&healthy| healthy)
        .count();

        (healthy_count * 100 / 4) as u8
    }

    /// Healthy at ≥80%, degraded at ≥50%, unhealthy otherwise.
    pub fn overall(&self) -> OverallHealth {
        match self.health_percent() {
            pct if pct >= 80 => OverallHealth::Healthy,
            pct if pct >= 50 => OverallHealth::Degraded,
            _ => OverallHealth::Unhealthy,
        }
    }
}

/// Whether the source registry component counts as healthy: at least half of
/// the enabled sources are healthy, or at least one critical-priority source
/// is healthy regardless of the rest.
pub fn sources_component_healthy(
    healthy_count: usize,
    enabled_count: usize,
    any_critical_source_healthy: bool,
) -> bool {
    if any_critical_source_healthy {
        return true;
    }
    if enabled_count == 0 {
        return false;
    }
    (healthy_count as f64 / enabled_count as f64) >= 0.5
}
