//! Retry classification for source adapter calls.
//!
//! Adapters wrap their backend calls in [`pp_core::PipelineError`]. Only
//! `Unavailable` represents a transient backend condition worth retrying;
//! everything else (bad config, auth, a missing document, an open breaker)
//! would just fail again the same way.

use pp_core::PipelineError;

/// Whether a retry attempt should be made for this error.
///
/// Retries `Unavailable` only. Never retries `AuthError`, `ValidationError`,
/// `NotFound`, or `CircuitOpen` — retrying those wastes an attempt on an
/// error that will not change until something outside the adapter call
/// itself is fixed.
pub fn is_retryable_adapter_error<E>(error: &PipelineError<E>) -> bool {
    matches!(error, PipelineError::Unavailable(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn retries_only_unavailable() {
        let unavailable: PipelineError<String> = PipelineError::Unavailable("down".into());
        assert!(is_retryable_adapter_error(&unavailable));
    }

    #[test]
    fn never_retries_auth_validation_not_found_or_open_circuit() {
        let auth: PipelineError<String> = PipelineError::AuthError("bad token".into());
        let validation: PipelineError<String> = PipelineError::ValidationError("bad query".into());
        let not_found: PipelineError<String> = PipelineError::NotFound;
        let circuit_open: PipelineError<String> = PipelineError::CircuitOpen { name: None };

        assert!(!is_retryable_adapter_error(&auth));
        assert!(!is_retryable_adapter_error(&validation));
        assert!(!is_retryable_adapter_error(&not_found));
        assert!(!is_retryable_adapter_error(&circuit_open));
    }

    #[test]
    fn never_retries_rate_limited_or_overloaded_either() {
        let rate_limited: PipelineError<String> = PipelineError::RateLimited {
            retry_after: Some(Duration::from_secs(1)),
        };
        let overloaded: PipelineError<String> = PipelineError::Overloaded;

        assert!(!is_retryable_adapter_error(&rate_limited));
        assert!(!is_retryable_adapter_error(&overloaded));
    }
}
