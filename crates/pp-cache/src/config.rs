//! Configuration for the cache service: strategy, per-content-type TTLs, and
//! L1 sizing.

use crate::events::CacheEvent;
use crate::eviction::EvictionPolicy;
use pp_core::{EventListeners, FnListener};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// The kind of content a cache entry holds. Used as the first segment of a
/// cache key (`${content_type}:${identifier}`) and to look up the
/// content-type policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Runbooks,
    Procedures,
    DecisionTrees,
    KnowledgeBase,
    WebResponse,
}

impl ContentType {
    /// Returns the wire/key representation of this content type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Runbooks => "runbooks",
            ContentType::Procedures => "procedures",
            ContentType::DecisionTrees => "decision_trees",
            ContentType::KnowledgeBase => "knowledge_base",
            ContentType::WebResponse => "web_response",
        }
    }

    /// All content types, in the order the default policy table lists them.
    pub fn all() -> [ContentType; 5] {
        [
            ContentType::Runbooks,
            ContentType::Procedures,
            ContentType::DecisionTrees,
            ContentType::KnowledgeBase,
            ContentType::WebResponse,
        ]
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which tiers a cache instance consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Only the in-process L1 store is used.
    MemoryOnly,
    /// Only the distributed L2 backend is used; every lookup is async.
    DistributedOnly,
    /// L1 is checked first, then L2. L2 hits are promoted into L1.
    Hybrid,
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::Hybrid
    }
}

/// Per-content-type cache policy.
#[derive(Debug, Clone, Copy)]
pub struct ContentTypePolicy {
    pub ttl: Duration,
    pub warmup: bool,
}

impl ContentTypePolicy {
    pub fn new(ttl: Duration, warmup: bool) -> Self {
        Self { ttl, warmup }
    }
}

/// Configuration for the cache service.
pub struct CacheConfig {
    pub(crate) strategy: CacheStrategy,
    pub(crate) default_ttl: Duration,
    pub(crate) policies: HashMap<ContentType, ContentTypePolicy>,
    pub(crate) l1_max_size: usize,
    pub(crate) l1_eviction_policy: EvictionPolicy,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
    pub(crate) name: String,
}

impl CacheConfig {
    /// Starts a [`CacheConfigBuilder`] with the default strategy, TTL, and L1
    /// sizing.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// Returns the configured policy for a content type, falling back to the
    /// default TTL with warmup disabled when the table has no entry.
    pub(crate) fn policy_for(&self, content_type: ContentType) -> ContentTypePolicy {
        self.policies
            .get(&content_type)
            .copied()
            .unwrap_or(ContentTypePolicy {
                ttl: self.default_ttl,
                warmup: false,
            })
    }

    /// Content types whose policy has `warmup=true`, in table order.
    pub fn warmup_content_types(&self) -> Vec<ContentType> {
        ContentType::all()
            .into_iter()
            .filter(|ct| self.policy_for(*ct).warmup)
            .collect()
    }
}

/// Builder for [`CacheConfig`].
pub struct CacheConfigBuilder {
    strategy: CacheStrategy,
    default_ttl: Duration,
    policies: HashMap<ContentType, ContentTypePolicy>,
    l1_max_size: usize,
    l1_eviction_policy: EvictionPolicy,
    event_listeners: EventListeners<CacheEvent>,
    name: String,
}

impl CacheConfigBuilder {
    /// Creates a new builder with default values: hybrid strategy, a 5 minute
    /// default TTL, a 10,000 entry LRU-evicted L1.
    pub fn new() -> Self {
        Self {
            strategy: CacheStrategy::default(),
            default_ttl: Duration::from_secs(300),
            policies: HashMap::new(),
            l1_max_size: 10_000,
            l1_eviction_policy: EvictionPolicy::Lru,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets which tiers this cache instance consults.
    ///
    /// Default: [`CacheStrategy::Hybrid`]
    pub fn strategy(mut self, strategy: CacheStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the TTL applied to content types absent from the policy table.
    ///
    /// Default: 300s
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Registers a per-content-type policy, overriding the default TTL for
    /// that content type and optionally flagging it for startup warming.
    pub fn policy(mut self, content_type: ContentType, ttl: Duration, warmup: bool) -> Self {
        self.policies
            .insert(content_type, ContentTypePolicy::new(ttl, warmup));
        self
    }

    /// Sets the maximum number of entries held in the L1 store.
    ///
    /// Default: 10,000
    pub fn l1_max_size(mut self, size: usize) -> Self {
        self.l1_max_size = size;
        self
    }

    /// Sets the eviction policy used by the L1 store once it is full.
    ///
    /// Default: [`EvictionPolicy::Lru`]
    pub fn l1_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.l1_eviction_policy = policy;
        self
    }

    /// Sets the name of this cache instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked whenever a lookup is satisfied by either
    /// tier.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, CacheEvent::Hit { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a lookup finds no live entry.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, CacheEvent::Miss { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked whenever an entry is evicted or expires.
    pub fn on_eviction<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, CacheEvent::Eviction { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CacheConfig {
        CacheConfig {
            strategy: self.strategy,
            default_ttl: self.default_ttl,
            policies: self.policies,
            l1_max_size: self.l1_max_size,
            l1_eviction_policy: self.l1_eviction_policy,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = CacheConfigBuilder::new().build();
        assert_eq!(config.strategy, CacheStrategy::Hybrid);
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.l1_max_size, 10_000);
    }

    #[test]
    fn test_policy_table_overrides_default_ttl() {
        let config = CacheConfigBuilder::new()
            .default_ttl(Duration::from_secs(60))
            .policy(ContentType::Runbooks, Duration::from_secs(3600), true)
            .build();

        let runbooks = config.policy_for(ContentType::Runbooks);
        assert_eq!(runbooks.ttl, Duration::from_secs(3600));
        assert!(runbooks.warmup);

        let procedures = config.policy_for(ContentType::Procedures);
        assert_eq!(procedures.ttl, Duration::from_secs(60));
        assert!(!procedures.warmup);
    }

    #[test]
    fn test_warmup_content_types() {
        let config = CacheConfigBuilder::new()
            .policy(ContentType::Runbooks, Duration::from_secs(3600), true)
            .policy(ContentType::WebResponse, Duration::from_secs(30), false)
            .build();

        assert_eq!(config.warmup_content_types(), vec![ContentType::Runbooks]);
    }

    #[test]
    fn test_event_listeners() {
        let _config = CacheConfigBuilder::new()
            .on_hit(|| {})
            .on_miss(|| {})
            .on_eviction(|| {})
            .build();
    }

    #[test]
    fn test_content_type_key_segment() {
        assert_eq!(ContentType::Runbooks.as_str(), "runbooks");
        assert_eq!(ContentType::DecisionTrees.to_string(), "decision_trees");
    }
}
