//! Retry decision policy: which errors to retry and how long to wait.

use crate::backoff::IntervalFunction;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a particular error is worth retrying.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Combines a backoff strategy with an optional retry predicate.
///
/// Attempt counting lives outside this type (in [`crate::config::RetryConfig`]'s
/// `MaxAttemptsSource`) since the cap can vary per request; `RetryPolicy` only
/// answers "should this error be retried" and "how long until the next try".
pub struct RetryPolicy<E> {
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Creates a policy that retries every error by default.
    pub fn new(interval_fn: Arc<dyn IntervalFunction>) -> Self {
        Self {
            interval_fn,
            retry_predicate: None,
        }
    }

    /// Restricts retries to errors for which `predicate` returns `true`.
    pub fn with_retry_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Whether `error` should trigger another attempt.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }

    /// Delay before the next attempt, given the zero-indexed attempt number.
    pub fn next_backoff(&self, attempt: usize) -> Duration {
        self.interval_fn.next_interval(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::FixedInterval;

    #[test]
    fn test_retry_all_by_default() {
        let policy: RetryPolicy<String> =
            RetryPolicy::new(Arc::new(FixedInterval::new(Duration::from_millis(10))));
        assert!(policy.should_retry(&"anything".to_string()));
    }

    #[test]
    fn test_retry_predicate() {
        let policy = RetryPolicy::new(Arc::new(FixedInterval::new(Duration::from_millis(10))))
            .with_retry_predicate(|e: &String| e == "retryable");
        assert!(policy.should_retry(&"retryable".to_string()));
        assert!(!policy.should_retry(&"fatal".to_string()));
    }

    #[test]
    fn test_backoff_computation() {
        let policy: RetryPolicy<String> =
            RetryPolicy::new(Arc::new(FixedInterval::new(Duration::from_millis(250))));
        assert_eq!(policy.next_backoff(0), Duration::from_millis(250));
        assert_eq!(policy.next_backoff(5), Duration::from_millis(250));
    }
}
