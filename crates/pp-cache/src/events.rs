//! Events emitted by the cache service.

use pp_core::ResilienceEvent;
use std::time::Instant;

/// Events emitted by [`crate::Cache`] for observability.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A lookup found a live entry, either in L1 or L2.
    Hit {
        pattern_name: String,
        content_type: String,
        key: String,
        tier: CacheTier,
        timestamp: Instant,
    },
    /// A lookup found no entry in any configured tier.
    Miss {
        pattern_name: String,
        content_type: String,
        key: String,
        timestamp: Instant,
    },
    /// An entry was removed to make room for a new one, or expired.
    Eviction {
        pattern_name: String,
        content_type: String,
        key: String,
        timestamp: Instant,
    },
}

/// Which tier satisfied a cache hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    L1,
    L2,
}

impl ResilienceEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Eviction { .. } => "eviction",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. } => *timestamp,
            CacheEvent::Miss { timestamp, .. } => *timestamp,
            CacheEvent::Eviction { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CacheEvent::Hit { pattern_name, .. } => pattern_name,
            CacheEvent::Miss { pattern_name, .. } => pattern_name,
            CacheEvent::Eviction { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let hit = CacheEvent::Hit {
            pattern_name: "pp-cache".into(),
            content_type: "runbooks".into(),
            key: "runbooks:disk-full".into(),
            tier: CacheTier::L1,
            timestamp: Instant::now(),
        };
        assert_eq!(hit.event_type(), "hit");
        assert_eq!(hit.pattern_name(), "pp-cache");

        let miss = CacheEvent::Miss {
            pattern_name: "pp-cache".into(),
            content_type: "runbooks".into(),
            key: "runbooks:disk-full".into(),
            timestamp: Instant::now(),
        };
        assert_eq!(miss.event_type(), "miss");

        let eviction = CacheEvent::Eviction {
            pattern_name: "pp-cache".into(),
            content_type: "runbooks".into(),
            key: "runbooks:disk-full".into(),
            timestamp: Instant::now(),
        };
        assert_eq!(eviction.event_type(), "eviction");
    }
}
