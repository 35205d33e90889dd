//! The factory map's value type.

use pp_adapter::{AdapterResult, SourceAdapter};
use pp_types::SourceConfig;
use std::sync::Arc;

/// Constructs a not-yet-initialized adapter from a source config. Stored as
/// a trait object so the registry can hold one factory per [`SourceKind`]
/// without a generic parameter leaking into [`crate::Registry`] itself —
/// the same erase-the-closure move [`pp_adapters::support::Guarded`] makes
/// for per-call circuit-breaker closures.
///
/// [`SourceKind`]: pp_types::SourceKind
pub type AdapterFactory =
    Arc<dyn Fn(&SourceConfig) -> AdapterResult<Box<dyn SourceAdapter>> + Send + Sync>;
