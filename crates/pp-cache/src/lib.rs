//! Two-tier lookup cache for source adapter responses.
//!
//! Entries are addressed by `${content_type}:${identifier}` keys. Reads
//! follow the configured [`CacheStrategy`]: `memory_only` never leaves the
//! process, `distributed_only` always goes to the L2 backend, and `hybrid`
//! checks L1 first and falls back to L2, promoting hits back into L1 with
//! their remaining TTL.
//!
//! Concurrent misses for the same key are coalesced behind a single loader
//! (single-flight); the other callers inherit its result rather than each
//! re-fetching from the source adapter.
//!
//! # Examples
//!
//! ```
//! use pp_cache::{Cache, CacheConfig, ContentType};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheConfig::builder()
//!     .policy(ContentType::Runbooks, Duration::from_secs(3600), true)
//!     .build();
//!
//! let cache: Cache<String> = Cache::new(config);
//!
//! let value = cache
//!     .get_or_load(ContentType::Runbooks, "disk-full", || async {
//!         Ok::<_, std::io::Error>("runbook body".to_string())
//!     })
//!     .await?;
//! assert_eq!(value, "runbook body");
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//! - `metrics`: emits hit/miss/eviction counters via the `metrics` crate.
//! - `tracing`: emits debug spans for tier promotion and L2 write failures.

mod config;
mod error;
mod eviction;
mod events;
mod store;

pub use config::{CacheConfig, CacheConfigBuilder, CacheStrategy, ContentType, ContentTypePolicy};
pub use error::CacheError;
pub use events::{CacheEvent, CacheTier};
pub use eviction::EvictionPolicy;

use async_trait::async_trait;
use hashbrown::{HashMap as FastMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use store::CacheStore;
use tokio::sync::broadcast;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

/// A distributed (L2) cache backend. Implementations wrap the actual
/// transport (Redis, memcached, ...); this crate only defines the contract
/// the hybrid strategy drives it through.
#[async_trait]
pub trait L2Backend<V>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches a value by its full `${content_type}:${identifier}` key,
    /// along with however much TTL the backend has left on it. Promotion
    /// into L1 uses this rather than a fresh TTL so an L2 entry does not
    /// outlive its original expiry once it has a local copy.
    async fn get(&self, key: &str) -> Result<Option<(V, Duration)>, Self::Error>;

    /// Stores a value with the given TTL.
    async fn set(&self, key: &str, value: V, ttl: Duration) -> Result<(), Self::Error>;

    /// Removes a single key.
    async fn delete(&self, key: &str) -> Result<(), Self::Error>;

    /// Removes every key whose content-type prefix matches. May be O(keys).
    async fn clear_prefix(&self, content_type_prefix: &str) -> Result<(), Self::Error>;

    /// Removes everything this backend holds for the pipeline.
    async fn clear_all(&self) -> Result<(), Self::Error>;

    /// Whether the backend currently has a live connection. Surfaced in
    /// [`CacheStats::l2_connected`].
    fn is_connected(&self) -> bool;
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub l2_connected: bool,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or `0.0` if nothing has been recorded yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct ContentTypeCounters {
    hits: u64,
    misses: u64,
}

struct Stats {
    per_type: Mutex<FastMap<ContentType, ContentTypeCounters>>,
}

impl Stats {
    fn new() -> Self {
        Self {
            per_type: Mutex::new(FastMap::new()),
        }
    }

    fn record_hit(&self, content_type: ContentType) {
        let mut per_type = self.per_type.lock().unwrap();
        per_type.entry(content_type).or_default().hits += 1;
    }

    fn record_miss(&self, content_type: ContentType) {
        let mut per_type = self.per_type.lock().unwrap();
        per_type.entry(content_type).or_default().misses += 1;
    }

    fn totals(&self) -> (u64, u64) {
        let per_type = self.per_type.lock().unwrap();
        per_type
            .values()
            .fold((0, 0), |(h, m), c| (h + c.hits, m + c.misses))
    }

    fn per_type_breakdown(&self) -> Vec<(ContentType, u64, u64)> {
        let per_type = self.per_type.lock().unwrap();
        per_type
            .iter()
            .map(|(ct, c)| (*ct, c.hits, c.misses))
            .collect()
    }
}

/// Tracks in-flight loaders for single-flight stampede avoidance, keyed by
/// the full cache key.
struct InFlightLoaders<V> {
    waiters: Mutex<FastMap<String, broadcast::Sender<Option<V>>>>,
}

impl<V: Clone + Send + 'static> InFlightLoaders<V> {
    fn new() -> Self {
        Self {
            waiters: Mutex::new(FastMap::new()),
        }
    }

    /// Attempts to become the leader for `key`. `None` means the caller
    /// should load; `Some(rx)` means another caller is already loading and
    /// the result should be awaited on `rx`.
    fn try_join(&self, key: &str) -> Option<broadcast::Receiver<Option<V>>> {
        let mut waiters = self.waiters.lock().unwrap();
        if let Some(tx) = waiters.get(key) {
            Some(tx.subscribe())
        } else {
            let (tx, _rx) = broadcast::channel(1);
            waiters.insert(key.to_string(), tx);
            None
        }
    }

    fn complete(&self, key: &str, result: Option<V>) {
        let mut waiters = self.waiters.lock().unwrap();
        if let Some(tx) = waiters.remove(key) {
            let _ = tx.send(result);
        }
    }

    fn cancel(&self, key: &str) {
        self.waiters.lock().unwrap().remove(key);
    }
}

fn cache_key(content_type: ContentType, identifier: &str) -> String {
    format!("{}:{}", content_type.as_str(), identifier)
}

fn content_type_from_key(key: &str) -> Option<ContentType> {
    let prefix = key.split_once(':').map(|(p, _)| p).unwrap_or(key);
    ContentType::all().into_iter().find(|ct| ct.as_str() == prefix)
}

/// Two-tier cache over arbitrary cacheable values.
///
/// `V` is typically a serialized document or tool response; it must be
/// `Clone` since both tiers and in-flight waiters hand out copies.
pub struct Cache<V> {
    config: Arc<CacheConfig>,
    l1: Arc<Mutex<CacheStore<String, V>>>,
    /// Keys currently resident in L1, grouped by content type, so
    /// `clear_by_type` can sweep L1 without an iteration API on
    /// `EvictionStore`.
    l1_keys: Arc<Mutex<FastMap<ContentType, HashSet<String>>>>,
    l2: Option<Arc<dyn L2BackendErased<V>>>,
    stats: Arc<Stats>,
    in_flight: Arc<InFlightLoaders<V>>,
}

/// Object-safe erasure over [`L2Backend`] so `Cache<V>` does not need to be
/// generic over the backend's error type.
#[async_trait]
trait L2BackendErased<V>: Send + Sync {
    async fn get(&self, key: &str) -> Option<(V, Duration)>;
    async fn set(&self, key: &str, value: V, ttl: Duration);
    async fn delete(&self, key: &str);
    async fn clear_prefix(&self, content_type_prefix: &str);
    async fn clear_all(&self);
    fn is_connected(&self) -> bool;
}

struct L2Adapter<B> {
    backend: B,
    name: String,
}

#[async_trait]
impl<V, B> L2BackendErased<V> for L2Adapter<B>
where
    V: Send + Sync + 'static,
    B: L2Backend<V>,
{
    async fn get(&self, key: &str) -> Option<(V, Duration)> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(cache = %self.name, key, error = %_e, "L2 read failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: V, ttl: Duration) {
        if let Err(_e) = self.backend.set(key, value, ttl).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(cache = %self.name, key, error = %_e, "L2 write failed, L1 write still applied");
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(_e) = self.backend.delete(key).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(cache = %self.name, key, error = %_e, "L2 delete failed");
        }
    }

    async fn clear_prefix(&self, content_type_prefix: &str) {
        if let Err(_e) = self.backend.clear_prefix(content_type_prefix).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(cache = %self.name, prefix = content_type_prefix, error = %_e, "L2 clear_by_type failed");
        }
    }

    async fn clear_all(&self) {
        if let Err(_e) = self.backend.clear_all().await {
            #[cfg(feature = "tracing")]
            tracing::warn!(cache = %self.name, error = %_e, "L2 clear_all failed");
        }
    }

    fn is_connected(&self) -> bool {
        self.backend.is_connected()
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with no L2 backend. `strategy` is honored as given:
    /// `distributed_only`/`hybrid` configs built this way behave like
    /// `memory_only` until [`with_l2`](Self::with_l2) attaches a backend.
    pub fn new(config: CacheConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!("pp_cache_hits_total", "Total cache hits by content type");
            describe_counter!("pp_cache_misses_total", "Total cache misses by content type");
            describe_counter!(
                "pp_cache_evictions_total",
                "Total L1 cache evictions by content type"
            );
        }

        let l1 = CacheStore::new(config.l1_max_size, config.l1_eviction_policy);
        Self {
            config: Arc::new(config),
            l1: Arc::new(Mutex::new(l1)),
            l1_keys: Arc::new(Mutex::new(FastMap::new())),
            l2: None,
            stats: Arc::new(Stats::new()),
            in_flight: Arc::new(InFlightLoaders::new()),
        }
    }

    /// Attaches a distributed backend, required for `distributed_only` and
    /// `hybrid` strategies to actually reach L2.
    pub fn with_l2<B>(mut self, backend: B) -> Self
    where
        B: L2Backend<V> + 'static,
    {
        self.l2 = Some(Arc::new(L2Adapter {
            backend,
            name: self.config.name.clone(),
        }));
        self
    }

    fn emit_hit(&self, content_type: ContentType, key: &str, tier: CacheTier) {
        self.stats.record_hit(content_type);
        #[cfg(feature = "metrics")]
        counter!("pp_cache_hits_total", "content_type" => content_type.as_str()).increment(1);
        self.config.event_listeners.emit(&CacheEvent::Hit {
            pattern_name: self.config.name.clone(),
            content_type: content_type.as_str().to_string(),
            key: key.to_string(),
            tier,
            timestamp: Instant::now(),
        });
    }

    fn emit_miss(&self, content_type: ContentType, key: &str) {
        self.stats.record_miss(content_type);
        #[cfg(feature = "metrics")]
        counter!("pp_cache_misses_total", "content_type" => content_type.as_str()).increment(1);
        self.config.event_listeners.emit(&CacheEvent::Miss {
            pattern_name: self.config.name.clone(),
            content_type: content_type.as_str().to_string(),
            key: key.to_string(),
            timestamp: Instant::now(),
        });
    }

    fn emit_eviction(&self, content_type: ContentType, key: &str) {
        #[cfg(feature = "metrics")]
        counter!("pp_cache_evictions_total", "content_type" => content_type.as_str()).increment(1);
        self.config.event_listeners.emit(&CacheEvent::Eviction {
            pattern_name: self.config.name.clone(),
            content_type: content_type.as_str().to_string(),
            key: key.to_string(),
            timestamp: Instant::now(),
        });
    }

    /// Looks up `content_type:identifier` without invoking a loader on miss.
    pub async fn get(&self, content_type: ContentType, identifier: &str) -> Option<V> {
        let key = cache_key(content_type, identifier);

        if self.config.strategy != CacheStrategy::DistributedOnly {
            let hit = { self.l1.lock().unwrap().get(&key) };
            if let Some(value) = hit {
                self.emit_hit(content_type, &key, CacheTier::L1);
                return Some(value);
            }
        }

        if self.config.strategy != CacheStrategy::MemoryOnly {
            if let Some(l2) = &self.l2 {
                if let Some((value, remaining_ttl)) = l2.get(&key).await {
                    self.emit_hit(content_type, &key, CacheTier::L2);
                    if self.config.strategy == CacheStrategy::Hybrid {
                        self.insert_l1(content_type, key.clone(), value.clone(), Some(remaining_ttl));
                    }
                    return Some(value);
                }
            }
        }

        self.emit_miss(content_type, &key);
        None
    }

    /// Inserts into L1 and updates the content-type key registry, emitting
    /// an eviction event if the insert pushed out another entry.
    fn insert_l1(&self, content_type: ContentType, key: String, value: V, ttl: Option<Duration>) {
        let evicted = {
            let mut l1 = self.l1.lock().unwrap();
            l1.insert(key.clone(), value, ttl)
        };

        let mut registry = self.l1_keys.lock().unwrap();
        registry.entry(content_type).or_default().insert(key);

        if let Some((evicted_key, _)) = evicted {
            if let Some(evicted_type) = content_type_from_key(&evicted_key) {
                if let Some(set) = registry.get_mut(&evicted_type) {
                    set.remove(&evicted_key);
                }
            }
            drop(registry);
            self.emit_eviction(
                content_type_from_key(&evicted_key).unwrap_or(content_type),
                &evicted_key,
            );
        }
    }

    /// Unconditionally writes a value into the configured tiers: L1
    /// synchronously, L2 asynchronously (a failed L2 write is logged and
    /// never fails the caller).
    pub async fn put(&self, content_type: ContentType, identifier: &str, value: V) {
        let key = cache_key(content_type, identifier);
        let ttl = self.config.policy_for(content_type).ttl;

        if self.config.strategy != CacheStrategy::DistributedOnly {
            self.insert_l1(content_type, key.clone(), value.clone(), Some(ttl));
        }

        if self.config.strategy != CacheStrategy::MemoryOnly {
            if let Some(l2) = &self.l2 {
                l2.set(&key, value, ttl).await;
            }
        }
    }

    /// Looks up `content_type:identifier`; on miss, runs `loader` and caches
    /// its result. Concurrent misses for the same key coalesce behind a
    /// single execution of `loader`: the leader runs it, waiters receive a
    /// clone of its result.
    pub async fn get_or_load<F, Fut, E>(
        &self,
        content_type: ContentType,
        identifier: &str,
        loader: F,
    ) -> Result<V, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(content_type, identifier).await {
            return Ok(value);
        }

        let key = cache_key(content_type, identifier);

        if let Some(mut rx) = self.in_flight.try_join(&key) {
            return match rx.recv().await {
                Ok(Some(value)) => Ok(value),
                Ok(None) => {
                    // The leader's loader failed; fall through to load ourselves
                    // rather than invent an error the waiter never produced.
                    self.load_as_leader(content_type, &key, loader).await
                }
                Err(_) => self.load_as_leader(content_type, &key, loader).await,
            };
        }

        self.load_as_leader(content_type, &key, loader).await
    }

    async fn load_as_leader<F, Fut, E>(
        &self,
        content_type: ContentType,
        key: &str,
        loader: F,
    ) -> Result<V, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let result = loader().await;
        match result {
            Ok(value) => {
                self.in_flight.complete(key, Some(value.clone()));
                let identifier = key
                    .split_once(':')
                    .map(|(_, id)| id)
                    .unwrap_or(key);
                self.put(content_type, identifier, value.clone()).await;
                Ok(value)
            }
            Err(e) => {
                self.in_flight.cancel(key);
                Err(CacheError::Loader(e))
            }
        }
    }

    /// Removes a single entry from both tiers.
    pub async fn delete(&self, content_type: ContentType, identifier: &str) {
        let key = cache_key(content_type, identifier);
        self.l1.lock().unwrap().remove(&key);
        if let Some(set) = self.l1_keys.lock().unwrap().get_mut(&content_type) {
            set.remove(&key);
        }
        if let Some(l2) = &self.l2 {
            l2.delete(&key).await;
        }
    }

    /// Removes every entry of a given content type from both tiers. The L1
    /// pass is O(keys) since `EvictionStore` has no prefix index; the key
    /// registry this cache maintains makes it O(keys of that type) rather
    /// than O(all keys).
    pub async fn clear_by_type(&self, content_type: ContentType) {
        {
            let keys = self
                .l1_keys
                .lock()
                .unwrap()
                .remove(&content_type)
                .unwrap_or_default();
            let mut l1 = self.l1.lock().unwrap();
            for key in keys {
                l1.remove(&key);
            }
        }
        if let Some(l2) = &self.l2 {
            l2.clear_prefix(content_type.as_str()).await;
        }
    }

    /// Removes every entry from both tiers.
    pub async fn clear_all(&self) {
        self.l1.lock().unwrap().clear();
        self.l1_keys.lock().unwrap().clear();
        if let Some(l2) = &self.l2 {
            l2.clear_all().await;
        }
    }

    /// Returns the content types flagged `warmup=true` in the policy table.
    /// The orchestrator calls this on startup to know what to prefetch.
    pub fn warmup_content_types(&self) -> Vec<ContentType> {
        self.config.warmup_content_types()
    }

    /// Point-in-time statistics: hits, misses, per-type breakdown, and
    /// whether an L2 backend is attached and connected.
    pub fn stats(&self) -> CacheStats {
        let (hits, misses) = self.stats.totals();
        CacheStats {
            hits,
            misses,
            l2_connected: self.l2.as_ref().is_some_and(|l2| l2.is_connected()),
        }
    }

    /// Per-content-type hit/miss counts.
    pub fn stats_by_type(&self) -> Vec<(ContentType, CacheStats)> {
        self.stats
            .per_type_breakdown()
            .into_iter()
            .map(|(ct, hits, misses)| {
                (
                    ct,
                    CacheStats {
                        hits,
                        misses,
                        l2_connected: self.l2.as_ref().is_some_and(|l2| l2.is_connected()),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config_with(strategy: CacheStrategy) -> CacheConfig {
        CacheConfig::builder()
            .strategy(strategy)
            .default_ttl(Duration::from_secs(60))
            .build()
    }

    #[tokio::test]
    async fn get_or_load_misses_then_hits() {
        let cache: Cache<String> = Cache::new(config_with(CacheStrategy::MemoryOnly));
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = Arc::clone(&call_count);

        let value = cache
            .get_or_load(ContentType::Runbooks, "disk-full", || {
                let cc = Arc::clone(&cc);
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>("body".to_string())
                }
            })
            .await
            .unwrap();
        assert_eq!(value, "body");
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        let cc2 = Arc::clone(&call_count);
        let value2 = cache
            .get_or_load(ContentType::Runbooks, "disk-full", || {
                let cc2 = Arc::clone(&cc2);
                async move {
                    cc2.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>("body".to_string())
                }
            })
            .await
            .unwrap();
        assert_eq!(value2, "body");
        assert_eq!(call_count.load(Ordering::SeqCst), 1, "second call should hit L1");
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_behind_one_loader() {
        let cache: Arc<Cache<String>> = Arc::new(Cache::new(config_with(CacheStrategy::MemoryOnly)));
        let call_count = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let cc = Arc::clone(&call_count);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_load(ContentType::Runbooks, "same-key", || {
                        let cc = Arc::clone(&cc);
                        async move {
                            cc.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(30)).await;
                            Ok::<_, std::io::Error>("body".to_string())
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "body");
        }
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_content_types_do_not_collide() {
        let cache: Cache<String> = Cache::new(config_with(CacheStrategy::MemoryOnly));

        cache
            .get_or_load(ContentType::Runbooks, "id", || async {
                Ok::<_, std::io::Error>("runbook".to_string())
            })
            .await
            .unwrap();
        cache
            .get_or_load(ContentType::KnowledgeBase, "id", || async {
                Ok::<_, std::io::Error>("kb-article".to_string())
            })
            .await
            .unwrap();

        assert_eq!(
            cache.get(ContentType::Runbooks, "id").await,
            Some("runbook".to_string())
        );
        assert_eq!(
            cache.get(ContentType::KnowledgeBase, "id").await,
            Some("kb-article".to_string())
        );
    }

    #[tokio::test]
    async fn ttl_expiration_causes_reload() {
        let config = CacheConfig::builder()
            .strategy(CacheStrategy::MemoryOnly)
            .policy(ContentType::WebResponse, Duration::from_millis(30), false)
            .build();
        let cache: Cache<String> = Cache::new(config);
        let call_count = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let cc = Arc::clone(&call_count);
            cache
                .get_or_load(ContentType::WebResponse, "page", || {
                    let cc = Arc::clone(&cc);
                    async move {
                        cc.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, std::io::Error>("page body".to_string())
                    }
                })
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache: Cache<String> = Cache::new(config_with(CacheStrategy::MemoryOnly));
        cache.put(ContentType::Runbooks, "id", "body".to_string()).await;
        assert!(cache.get(ContentType::Runbooks, "id").await.is_some());

        cache.delete(ContentType::Runbooks, "id").await;
        assert!(cache.get(ContentType::Runbooks, "id").await.is_none());
    }

    #[tokio::test]
    async fn loader_error_is_not_cached() {
        let cache: Cache<String> = Cache::new(config_with(CacheStrategy::MemoryOnly));
        let call_count = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let cc = Arc::clone(&call_count);
            let result = cache
                .get_or_load(ContentType::Runbooks, "flaky", || {
                    let cc = Arc::clone(&cc);
                    async move {
                        cc.fetch_add(1, Ordering::SeqCst);
                        Err::<String, _>(std::io::Error::other("unavailable"))
                    }
                })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stats_track_hits_and_misses() {
        let cache: Cache<String> = Cache::new(config_with(CacheStrategy::MemoryOnly));

        cache.get(ContentType::Runbooks, "id").await; // miss
        cache.put(ContentType::Runbooks, "id", "body".to_string()).await;
        cache.get(ContentType::Runbooks, "id").await; // hit

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
        assert!(!stats.l2_connected);
    }

    #[tokio::test]
    async fn warmup_content_types_reflects_policy_table() {
        let config = CacheConfig::builder()
            .policy(ContentType::Runbooks, Duration::from_secs(3600), true)
            .build();
        let cache: Cache<String> = Cache::new(config);
        assert_eq!(cache.warmup_content_types(), vec![ContentType::Runbooks]);
    }
}
