//! The error type adapters use for the one failure mode the shared
//! taxonomy doesn't already name: a backend-specific error that still
//! needs a human-readable message at the tool boundary.

use std::fmt;

/// An opaque, backend-specific error wrapped as
/// [`pp_core::PipelineError::Application`] when none of the standard kinds
/// fit. Adapters should prefer mapping into a standard kind
/// (`Unavailable`, `AuthError`, ...) wherever the backend's failure
/// corresponds to one; this exists for the remainder.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The error type threaded through every [`crate::SourceAdapter`] method
/// that can fail.
pub type AdapterError = pp_core::PipelineError<BackendError>;

/// Shorthand for a `Result` carrying [`AdapterError`].
pub type AdapterResult<T> = Result<T, AdapterError>;
