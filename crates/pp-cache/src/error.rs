//! Error types for the cache service.

use std::fmt;

/// Errors that can occur when consulting the cache.
///
/// L2 write failures are never surfaced here: per the hybrid strategy's
/// degrade-gracefully contract, a failed distributed write is logged and
/// does not fail the caller. This type only carries errors from paths the
/// caller is actually waiting on: an L2-only read, or a stampede loader.
#[derive(Debug)]
pub enum CacheError<E> {
    /// The L2 backend returned an error while servicing a read the caller
    /// was waiting on (`distributed_only`, or `hybrid` with no L1 entry).
    L2(E),
    /// The single-flight loader for this key returned an error.
    Loader(E),
}

impl<E: fmt::Display> fmt::Display for CacheError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::L2(e) => write!(f, "L2 cache backend error: {}", e),
            CacheError::Loader(e) => write!(f, "cache loader error: {}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CacheError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::L2(e) => Some(e),
            CacheError::Loader(e) => Some(e),
        }
    }
}

impl<E> CacheError<E> {
    /// Converts this error into the inner error, discarding which path
    /// produced it.
    pub fn into_inner(self) -> E {
        match self {
            CacheError::L2(e) => e,
            CacheError::Loader(e) => e,
        }
    }
}
