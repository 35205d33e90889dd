use std::fmt;
use pp_core::PipelineError;

/// Errors that can occur when using the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterError {
    /// The rate budget was exceeded and no permit could be acquired within the timeout.
    RateLimitExceeded,
}

impl fmt::Display for RateLimiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimiterError::RateLimitExceeded => write!(f, "rate limit exceeded"),
        }
    }
}

impl std::error::Error for RateLimiterError {}

/// Conversion to the shared error taxonomy for zero-boilerplate adapter error handling.
///
/// `retry_after` is left `None`: this limiter enforces a local request budget
/// and does not itself parse an upstream `Retry-After` header (the git-host
/// adapter does that separately when the remote signals exhaustion).
impl<E> From<RateLimiterError> for PipelineError<E> {
    fn from(_err: RateLimiterError) -> Self {
        PipelineError::RateLimited { retry_after: None }
    }
}
