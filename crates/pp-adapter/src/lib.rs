//! The source adapter contract (§4.3).
//!
//! Every backend kind — file, git-host, wiki, database, web — implements
//! [`SourceAdapter`] the same way a Tower middleware stack implements
//! `Service`: one trait, several wildly different backends, one registry
//! that doesn't need to know which kind it's holding.
//!
//! `healthcheck`, `metadata`, and `cleanup` are documented as "never
//! throws" in the contract; this crate enforces that at the type level by
//! giving them infallible return types instead of `Result`.

mod error;
mod metadata;

pub use error::{AdapterError, AdapterResult, BackendError};
pub use metadata::AdapterMetadata;

use async_trait::async_trait;
use pp_types::{Document, Filter, HealthCheck, Runbook, Severity};

/// The uniform capability set every source adapter exposes (§4.3 table).
///
/// Implementations wrap their backend client in a circuit breaker
/// ([`pp_circuitbreaker`]) and consult the shared cache ([`pp_cache`]) for
/// cacheable reads themselves — the trait only describes the contract, not
/// how an implementation achieves resilience, so those crates are not
/// dependencies of this one.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Prepares the adapter to serve requests: opens connections,
    /// validates credentials, and warms whatever index the backend needs.
    /// Called once by the registry before the adapter is inserted into the
    /// adapter map.
    async fn initialize(&self) -> AdapterResult<()>;

    /// Free-text search, honoring whichever clauses of `filters` this
    /// adapter can push down to its backend. Clauses it cannot push down
    /// are left for the pipeline to enforce.
    async fn search(&self, query: &str, filters: &Filter) -> AdapterResult<Vec<Document>>;

    /// Fetches a single document by its adapter-scoped id.
    async fn get(&self, id: &str) -> AdapterResult<Document>;

    /// Finds runbooks matching an alert signature.
    async fn search_runbooks(
        &self,
        alert_type: &str,
        severity: Severity,
        affected_systems: &[String],
        context: Option<&str>,
    ) -> AdapterResult<Vec<Runbook>>;

    /// Reports this adapter's current health. Never returns an error: a
    /// failing backend is encoded as `HealthCheck { healthy: false, .. }`.
    async fn healthcheck(&self) -> HealthCheck;

    /// Best-effort index refresh. `force` bypasses whatever staleness
    /// check the adapter would otherwise use to skip a no-op refresh.
    /// Returns whether the refresh completed; never errors.
    async fn refresh_index(&self, force: bool) -> bool;

    /// Self-description for the registry and `list_sources`. Synchronous
    /// and infallible — adapters cache whatever counters this needs rather
    /// than compute them on the fly.
    fn metadata(&self) -> AdapterMetadata;

    /// Releases the adapter's backend connections and any other held
    /// resources. Never errors; failures are logged by the implementation
    /// and swallowed so the registry's cleanup fan-out is never blocked by
    /// one misbehaving adapter.
    async fn cleanup(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pp_types::Category;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// A minimal adapter used to confirm the trait is object-safe and that
    /// a `Box<dyn SourceAdapter>` can be driven through every method.
    struct StubAdapter {
        initialized: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        async fn initialize(&self) -> AdapterResult<()> {
            self.initialized.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn search(&self, _query: &str, _filters: &Filter) -> AdapterResult<Vec<Document>> {
            Ok(vec![])
        }

        async fn get(&self, _id: &str) -> AdapterResult<Document> {
            Err(AdapterError::NotFound)
        }

        async fn search_runbooks(
            &self,
            _alert_type: &str,
            _severity: Severity,
            _affected_systems: &[String],
            _context: Option<&str>,
        ) -> AdapterResult<Vec<Runbook>> {
            Ok(vec![])
        }

        async fn healthcheck(&self) -> HealthCheck {
            HealthCheck::healthy("stub", 1)
        }

        async fn refresh_index(&self, _force: bool) -> bool {
            true
        }

        fn metadata(&self) -> AdapterMetadata {
            AdapterMetadata::new("stub", pp_types::SourceKind::File)
        }

        async fn cleanup(&self) {}
    }

    #[tokio::test]
    async fn trait_object_drives_every_method() {
        let flag = Arc::new(AtomicBool::new(false));
        let adapter: Box<dyn SourceAdapter> = Box::new(StubAdapter {
            initialized: Arc::clone(&flag),
        });

        adapter.initialize().await.unwrap();
        assert!(flag.load(Ordering::SeqCst));

        assert!(adapter.search("q", &Filter::new()).await.unwrap().is_empty());
        assert!(matches!(adapter.get("x").await, Err(AdapterError::NotFound)));
        assert_eq!(adapter.metadata().kind, pp_types::SourceKind::File);
        assert!(adapter.healthcheck().await.healthy);
        assert!(adapter.refresh_index(false).await);
        adapter.cleanup().await;

        let _ = Category::Runbook;
    }
}
