//! Shared plumbing used by every adapter implementation: the guarded-call
//! composition (coalesce, circuit breaker, retry) and a couple of lexical
//! heuristics duplicated across kinds (category inference, fuzzy scoring)
//! that don't belong to any one backend.

use pp_adapter::AdapterError;
use pp_circuitbreaker::{CircuitBreakerError, CircuitBreakerLayer};
use pp_coalesce::{CoalesceError, CoalesceLayer};
use pp_config::CircuitBreakerDefaults;
use pp_ratelimiter::{RateLimiterError, RateLimiterLayer};
use pp_retry::RetryLayer;
use pp_types::Category;
use std::time::Duration;
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};

/// A backend call wrapped in request coalescing, a circuit breaker, and
/// bounded retry. `Req`/`Res` vary per adapter (a git-host's request is a
/// path, a database's is a query); boxed so the composed service can live
/// as a plain struct field instead of an anonymous generic.
pub type Guarded<Req, Res> = BoxCloneService<Req, Res, AdapterError>;

/// Builds a guarded backend call: concurrent identical requests are
/// coalesced onto a single execution ([`pp_coalesce`]), the result is
/// tracked by a circuit breaker tuned from `breaker_defaults`
/// ([`pp_circuitbreaker`]), and a call failing with [`AdapterError::Unavailable`]
/// is retried up to `max_retries` additional times with exponential backoff
/// ([`pp_retry`]) — auth/validation/not-found/circuit-open failures are
/// never retried.
pub fn guard<Req, Res, F, Fut>(
    name: &str,
    operation_timeout: Duration,
    breaker_defaults: &CircuitBreakerDefaults,
    max_retries: u32,
    f: F,
) -> Guarded<Req, Res>
where
    Req: Clone + std::fmt::Debug + Send + 'static,
    Res: Clone + Send + 'static,
    F: Fn(Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Res, AdapterError>> + Send + 'static,
{
    let backend = BoxCloneService::new(tower::service_fn(f));
    let coalesced = CoalesceLayer::new(|req: &Req| format!("{req:?}")).layer(backend);

    let breaker = CircuitBreakerLayer::builder()
        .failure_threshold(breaker_defaults.failure_threshold)
        .monitoring_window(breaker_defaults.monitoring_window)
        .success_threshold(breaker_defaults.success_threshold)
        .recovery_timeout(breaker_defaults.recovery_timeout)
        .operation_timeout(operation_timeout)
        .name(name)
        .build()
        .layer_fn(coalesced);

    let breaker_name = name.to_string();
    let mapped = tower::service_fn(move |req: Req| {
        let breaker = breaker.clone();
        let breaker_name = breaker_name.clone();
        async move {
            breaker
                .oneshot(req)
                .await
                .map_err(|e| map_breaker_error(e, &breaker_name))
        }
    });

    let retry = RetryLayer::builder()
        .max_attempts(max_retries as usize + 1)
        .exponential_backoff(Duration::from_millis(100))
        .retry_on(pp_retry::is_retryable_adapter_error)
        .name(format!("{name}-retry"))
        .build();

    BoxCloneService::new(retry.layer(mapped))
}

/// Maps the breaker's own failure modes (`OpenCircuit`, `Timeout`) and a
/// coalesced call's leader-side failures onto the shared error taxonomy so
/// [`guard`]'s caller only ever sees [`AdapterError`].
fn map_breaker_error(err: CircuitBreakerError<CoalesceError<AdapterError>>, name: &str) -> AdapterError {
    match err {
        CircuitBreakerError::OpenCircuit => AdapterError::CircuitOpen {
            name: Some(name.to_string()),
        },
        CircuitBreakerError::Timeout => AdapterError::Timeout {
            layer: "circuit_breaker",
        },
        CircuitBreakerError::Inner(CoalesceError::Service(inner)) => inner,
        CircuitBreakerError::Inner(CoalesceError::LeaderCancelled | CoalesceError::RecvError) => {
            AdapterError::Unavailable(format!("{name}: coalesced request lost its leader"))
        }
    }
}

/// Drives one call through a [`guard`]-built service.
pub async fn call<Req, Res>(guarded: &Guarded<Req, Res>, req: Req) -> Result<Res, AdapterError>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    guarded.clone().oneshot(req).await
}

/// Draws one permit from a remote-quota rate limiter before a backend call.
///
/// Used by adapters (`git_host`, `web`) that must stay under a budget the
/// remote itself publishes rather than only fail fast once the breaker
/// trips; kept separate from [`guard`]/[`call`] because composing the two
/// as Tower layers would discard the inner call's real error behind
/// `RateLimiterError`.
pub async fn acquire_rate_permit(limiter: &RateLimiterLayer) -> Result<(), AdapterError> {
    let svc = limiter.layer(tower::service_fn(|_: ()| async {
        Ok::<(), std::convert::Infallible>(())
    }));
    svc.oneshot(())
        .await
        .map_err(|_: RateLimiterError| AdapterError::RateLimited { retry_after: None })
}

/// Infers a document's category from its title/path using the same
/// lightweight keyword heuristic every adapter kind needs (front-matter
/// and table columns feed the same function once reduced to a string).
pub fn infer_category(hint: &str) -> Category {
    let lower = hint.to_lowercase();
    if lower.contains("runbook") {
        Category::Runbook
    } else if lower.contains("decision") || lower.contains("tree") {
        Category::DecisionTree
    } else if lower.contains("procedure") || lower.contains("playbook") {
        Category::Procedure
    } else if lower.contains("guide") || lower.contains("howto") || lower.contains("how-to") {
        Category::Guide
    } else {
        Category::General
    }
}

/// Normalized fuzzy lexical score in `[0, 1]` between a query and a
/// candidate string, used by adapters that have no native search endpoint
/// to rank their own in-memory scan.
pub fn fuzzy_score(query: &str, candidate: &str) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    strsim::jaro_winkler(&query.to_lowercase(), &candidate.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn infer_category_matches_runbook_keyword() {
        assert_eq!(infer_category("runbooks/disk-space.md"), Category::Runbook);
        assert_eq!(infer_category("decision-tree-outage.md"), Category::DecisionTree);
        assert_eq!(infer_category("random-notes.md"), Category::General);
    }

    #[test]
    fn fuzzy_score_is_higher_for_closer_matches() {
        let exact = fuzzy_score("disk space", "disk space runbook");
        let unrelated = fuzzy_score("disk space", "unrelated topic entirely");
        assert!(exact > unrelated);
    }

    #[tokio::test]
    async fn acquire_rate_permit_rejects_once_budget_spent() {
        let limiter = pp_ratelimiter::RateLimiterConfig::builder()
            .limit_for_period(1)
            .refresh_period(Duration::from_secs(10))
            .timeout_duration(Duration::from_millis(5))
            .build();
        assert!(acquire_rate_permit(&limiter).await.is_ok());
        assert!(matches!(
            acquire_rate_permit(&limiter).await,
            Err(AdapterError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn guard_fast_fails_once_breaker_trips() {
        let defaults = CircuitBreakerDefaults {
            failure_threshold: 5,
            ..CircuitBreakerDefaults::default()
        };
        let breaker = guard::<u32, (), _, _>("test", Duration::from_secs(1), &defaults, 0, |_req| async {
            Err(AdapterError::Unavailable("down".into()))
        });
        for i in 0..5 {
            let _ = call(&breaker, i).await;
        }
        let result = call(&breaker, 99).await;
        assert!(matches!(result, Err(AdapterError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn guard_retries_unavailable_up_to_max_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);
        let defaults = CircuitBreakerDefaults::default();
        let breaker = guard::<u32, &'static str, _, _>(
            "test-retry",
            Duration::from_secs(1),
            &defaults,
            2,
            move |_req| {
                let counted = Arc::clone(&counted);
                async move {
                    if counted.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(AdapterError::Unavailable("still down".into()))
                    } else {
                        Ok("recovered")
                    }
                }
            },
        );
        let result = call(&breaker, 1).await;
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn guard_never_retries_not_found() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);
        let defaults = CircuitBreakerDefaults::default();
        let breaker = guard::<u32, (), _, _>(
            "test-no-retry",
            Duration::from_secs(1),
            &defaults,
            3,
            move |_req| {
                counted.fetch_add(1, Ordering::SeqCst);
                async { Err(AdapterError::NotFound) }
            },
        );
        let result = call(&breaker, 1).await;
        assert!(matches!(result, Err(AdapterError::NotFound)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
