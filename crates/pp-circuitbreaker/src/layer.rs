use crate::config::CircuitBreakerConfig;
use crate::CircuitBreaker;
use std::sync::Arc;
use tower::Layer;

/// A Tower `Layer` that applies circuit breaker behavior to an inner service.
///
/// # Example
///
/// ```rust
/// use tower::{ServiceBuilder, service_fn};
/// use pp_circuitbreaker::CircuitBreakerLayer;
///
/// let layer = CircuitBreakerLayer::<String, std::io::Error>::builder()
///     .failure_threshold(5)
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
/// ```
#[derive(Clone)]
pub struct CircuitBreakerLayer<Res, Err> {
    config: Arc<CircuitBreakerConfig<Res, Err>>,
}

impl<Res, Err> CircuitBreakerLayer<Res, Err> {
    pub(crate) fn new(config: impl Into<Arc<CircuitBreakerConfig<Res, Err>>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Creates a new builder for configuring a circuit breaker layer.
    pub fn builder() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        crate::CircuitBreakerConfigBuilder::new()
    }

    /// Wraps the given service directly, bypassing `ServiceBuilder`.
    ///
    /// Useful when the caller needs the concrete `CircuitBreaker` type, for
    /// example to call `with_fallback()` or `state_sync()`.
    pub fn layer_fn<S>(&self, service: S) -> CircuitBreaker<S, Res, Err> {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }

    /// Preset: balanced defaults suitable for most dependencies.
    ///
    /// 5 failures within a 300s window trips the circuit; 60s recovery
    /// timeout; 3 consecutive successes close it again.
    pub fn standard() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        Self::builder()
    }

    /// Preset: fail fast, suitable for latency-sensitive dependencies.
    pub fn fast_fail() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        use std::time::Duration;
        Self::builder()
            .failure_threshold(2)
            .monitoring_window(Duration::from_secs(20))
            .recovery_timeout(Duration::from_secs(10))
            .success_threshold(1)
    }

    /// Preset: tolerant of transient failures, suitable for flaky upstreams.
    pub fn tolerant() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        use std::time::Duration;
        Self::builder()
            .failure_threshold(10)
            .monitoring_window(Duration::from_secs(120))
            .recovery_timeout(Duration::from_secs(60))
            .success_threshold(3)
    }
}

impl<S, Res, Err> Layer<S> for CircuitBreakerLayer<Res, Err> {
    type Service = CircuitBreaker<S, Res, Err>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }
}
