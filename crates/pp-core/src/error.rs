//! A unified error taxonomy for the pipeline.
//!
//! Every crate in this workspace maps its own error type into one of these
//! variants at its boundary (adapter, registry, pipeline, tool), so composing
//! several resilience layers — circuit breaker, cache, bulkhead — never
//! requires bespoke `From` glue between each pair of crates.

use std::fmt;
use std::time::Duration;

/// A correlation id attached to every user-visible error so operators can
/// find the matching log lines.
pub type CorrelationId = String;

/// Error kinds propagated across adapter, registry, pipeline, and tool
/// boundaries.
///
/// # Examples
///
/// ```
/// use pp_core::PipelineError;
///
/// #[derive(Debug)]
/// struct BackendError(String);
///
/// impl std::fmt::Display for BackendError {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "{}", self.0)
///     }
/// }
/// impl std::error::Error for BackendError {}
///
/// let err: PipelineError<BackendError> = PipelineError::Timeout { layer: "file_adapter" };
/// assert!(err.is_timeout());
/// ```
#[derive(Debug, Clone)]
pub enum PipelineError<E> {
    /// Configuration failed to load or validate.
    ConfigError(String),
    /// Credential resolution or authentication against a backend failed.
    AuthError(String),
    /// The requested document, procedure, or runbook does not exist.
    NotFound,
    /// Caller-supplied input failed validation.
    ValidationError(String),
    /// A source or network dependency is not reachable.
    Unavailable(String),
    /// An operation exceeded its deadline.
    Timeout {
        /// Name of the stage or layer that timed out.
        layer: &'static str,
    },
    /// The circuit breaker for a source is open.
    CircuitOpen {
        /// Source name, if known.
        name: Option<String>,
    },
    /// A source-side rate limit was hit.
    RateLimited {
        /// Suggested wait before retrying, if the backend provided one.
        retry_after: Option<Duration>,
    },
    /// The global inflight bound rejected the call.
    Overloaded,
    /// An unexpected internal error, always carrying a correlation id.
    Internal {
        /// Human-readable message; never includes credentials or paths.
        message: String,
        /// Correlation id for log lookup.
        correlation_id: CorrelationId,
    },
    /// The wrapped backend/application error.
    Application(E),
}

impl<E> PipelineError<E> {
    /// Wraps an arbitrary error as [`PipelineError::Internal`] with a fresh
    /// correlation id.
    pub fn internal(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        PipelineError::Internal {
            message: message.into(),
            correlation_id: correlation_id.into(),
        }
    }

    /// A short machine-readable code for this error kind, suitable for the
    /// `{code, message, correlation_id, suggestion?}` shape surfaced to callers.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::ConfigError(_) => "config_error",
            PipelineError::AuthError(_) => "auth_error",
            PipelineError::NotFound => "not_found",
            PipelineError::ValidationError(_) => "validation_error",
            PipelineError::Unavailable(_) => "unavailable",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::CircuitOpen { .. } => "circuit_open",
            PipelineError::RateLimited { .. } => "rate_limited",
            PipelineError::Overloaded => "overloaded",
            PipelineError::Internal { .. } => "internal",
            PipelineError::Application(_) => "application_error",
        }
    }

    /// A suggestion string for the caller, if one makes sense for this kind.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            PipelineError::CircuitOpen { .. } => {
                Some("retry later or request degraded mode explicitly")
            }
            PipelineError::RateLimited { .. } => Some("retry after the indicated delay"),
            PipelineError::Overloaded => Some("retry with backoff; the server is at capacity"),
            PipelineError::Timeout { .. } => Some("retry with a larger deadline if appropriate"),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Timeout { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, PipelineError::CircuitOpen { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::NotFound)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, PipelineError::Unavailable(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PipelineError::RateLimited { .. })
    }

    pub fn is_application(&self) -> bool {
        matches!(self, PipelineError::Application(_))
    }

    pub fn application_error(self) -> Option<E> {
        match self {
            PipelineError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the wrapped application error, leaving every other variant untouched.
    pub fn map_application<F, T>(self, f: F) -> PipelineError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            PipelineError::ConfigError(s) => PipelineError::ConfigError(s),
            PipelineError::AuthError(s) => PipelineError::AuthError(s),
            PipelineError::NotFound => PipelineError::NotFound,
            PipelineError::ValidationError(s) => PipelineError::ValidationError(s),
            PipelineError::Unavailable(s) => PipelineError::Unavailable(s),
            PipelineError::Timeout { layer } => PipelineError::Timeout { layer },
            PipelineError::CircuitOpen { name } => PipelineError::CircuitOpen { name },
            PipelineError::RateLimited { retry_after } => {
                PipelineError::RateLimited { retry_after }
            }
            PipelineError::Overloaded => PipelineError::Overloaded,
            PipelineError::Internal {
                message,
                correlation_id,
            } => PipelineError::Internal {
                message,
                correlation_id,
            },
            PipelineError::Application(e) => PipelineError::Application(f(e)),
        }
    }
}

impl<E> fmt::Display for PipelineError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ConfigError(msg) => write!(f, "configuration error: {msg}"),
            PipelineError::AuthError(msg) => write!(f, "authentication error: {msg}"),
            PipelineError::NotFound => write!(f, "not found"),
            PipelineError::ValidationError(msg) => write!(f, "validation error: {msg}"),
            PipelineError::Unavailable(msg) => write!(f, "unavailable: {msg}"),
            PipelineError::Timeout { layer } => write!(f, "timeout in {layer}"),
            PipelineError::CircuitOpen { name } => match name {
                Some(n) => write!(f, "circuit breaker '{n}' is open"),
                None => write!(f, "circuit breaker is open"),
            },
            PipelineError::RateLimited { retry_after } => match retry_after {
                Some(d) => write!(f, "rate limited, retry after {d:?}"),
                None => write!(f, "rate limited"),
            },
            PipelineError::Overloaded => write!(f, "overloaded"),
            PipelineError::Internal {
                message,
                correlation_id,
            } => write!(f, "internal error ({correlation_id}): {message}"),
            PipelineError::Application(e) => write!(f, "{e}"),
        }
    }
}

impl<E> std::error::Error for PipelineError<E> where E: std::error::Error {}
