//! Error types for bulkhead pattern.

/// Errors that can occur when using a bulkhead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BulkheadError {
    /// The bulkhead rejected the call because it's at capacity.
    #[error("bulkhead is full: max concurrent calls ({max_concurrent_calls}) reached")]
    BulkheadFull {
        /// Maximum concurrent calls allowed.
        max_concurrent_calls: usize,
    },
    /// Timeout waiting for a permit.
    #[error("timeout waiting for bulkhead permit")]
    Timeout,
}

/// Result type for bulkhead operations.
pub type Result<T> = std::result::Result<T, BulkheadError>;

/// Both bulkhead failure modes (full, or timed out waiting for a permit)
/// surface to callers as the shared `Overloaded` kind — a saturated
/// bulkhead is the backpressure signal of spec.md §5, not a distinct
/// error in its own right.
impl<E> From<BulkheadError> for pp_core::PipelineError<E> {
    fn from(_: BulkheadError) -> Self {
        pp_core::PipelineError::Overloaded
    }
}
