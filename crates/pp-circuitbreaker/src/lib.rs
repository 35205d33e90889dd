//! Per-dependency circuit breaker.
//!
//! A circuit breaker isolates callers from a failing dependency: once enough
//! failures accumulate within a rolling window, calls fail fast instead of
//! piling up against a dependency that is already struggling.
//!
//! ## States
//! - **Closed**: normal operation, all calls reach the inner service.
//! - **Open**: calls are fast-failed with [`CircuitBreakerError::OpenCircuit`].
//! - **HalfOpen**: a trial call is let through to probe for recovery.
//!
//! ```rust
//! use pp_circuitbreaker::CircuitBreakerLayer;
//! use tower::{service_fn, Layer};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let layer = CircuitBreakerLayer::<String, std::io::Error>::builder()
//!     .failure_threshold(5)
//!     .monitoring_window(Duration::from_secs(60))
//!     .recovery_timeout(Duration::from_secs(30))
//!     .operation_timeout(Duration::from_secs(10))
//!     .name("file-adapter")
//!     .build();
//!
//! let svc = service_fn(|req: String| async move { Ok::<String, std::io::Error>(req) });
//! let mut service = layer.layer(svc);
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: emits counters/gauges via the `metrics` crate.
//! - `tracing`: emits state-change spans via the `tracing` crate.
//! - `health-integration`: implements `pp_core::HealthTriggerable` so a health
//!   aggregator can proactively trip or reset the breaker.

use crate::circuit::Circuit;
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::task::{Context, Poll};
use tokio::sync::Mutex;
use tower::Service;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;

mod circuit;
mod config;
mod error;
mod events;
mod health_integration;
mod layer;

pub(crate) type FailureClassifier<Res, Err> = dyn Fn(&Result<Res, Err>) -> bool + Send + Sync;
pub(crate) type SharedFailureClassifier<Res, Err> = Arc<FailureClassifier<Res, Err>>;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A Tower `Service` that applies circuit breaker logic to an inner service.
pub struct CircuitBreaker<S, Res, Err> {
    inner: S,
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<std::sync::atomic::AtomicU8>,
    config: Arc<CircuitBreakerConfig<Res, Err>>,
}

impl<S, Res, Err> Clone for CircuitBreaker<S, Res, Err>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            circuit: Arc::clone(&self.circuit),
            state_atomic: Arc::clone(&self.state_atomic),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Res, Err> CircuitBreaker<S, Res, Err> {
    pub(crate) fn new(inner: S, config: Arc<CircuitBreakerConfig<Res, Err>>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "circuitbreaker_calls_total",
                "Total number of calls through the circuit breaker"
            );
            describe_counter!(
                "circuitbreaker_transitions_total",
                "Total number of circuit breaker state transitions"
            );
            describe_gauge!(
                "circuitbreaker_state",
                "Current state of the circuit breaker"
            );
        });

        let state_atomic = Arc::new(std::sync::atomic::AtomicU8::new(CircuitState::Closed as u8));
        Self {
            inner,
            circuit: Arc::new(Mutex::new(Circuit::new_with_atomic(Arc::clone(
                &state_atomic,
            )))),
            state_atomic,
            config,
        }
    }

    /// Forces the circuit into the OPEN state. For operator use (`manual_trip`).
    pub async fn force_open(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.force_open(&self.config);
    }

    /// Forces the circuit into the CLOSED state. For operator use (`manual_reset`).
    pub async fn force_closed(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.force_closed(&self.config);
    }

    /// Resets the circuit to CLOSED and clears its failure window.
    pub async fn reset(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.reset(&self.config);
    }

    /// Returns the current state of the circuit.
    pub async fn state(&self) -> CircuitState {
        let circuit = self.circuit.lock().await;
        circuit.state()
    }

    /// Returns the current state without requiring async context.
    ///
    /// Safe to call from sync code such as the health aggregator's metrics scrape.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(std::sync::atomic::Ordering::Acquire))
    }

    /// Returns a snapshot of the circuit's counters.
    pub async fn metrics(&self) -> CircuitMetrics {
        let circuit = self.circuit.lock().await;
        circuit.metrics()
    }
}

impl<S, Req, Res, Err> Service<Req> for CircuitBreaker<S, Res, Err>
where
    S: Service<Req, Response = Res, Error = Err> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Res: Send + 'static,
    Err: Send + 'static,
    Req: Send + 'static,
{
    type Response = Res;
    type Error = CircuitBreakerError<Err>;
    type Future = BoxFuture<'static, Result<Res, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let config = Arc::clone(&self.config);
        let circuit = Arc::clone(&self.circuit);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let permitted = {
                let mut circuit = circuit.lock().await;
                circuit.try_acquire(&config)
            };

            if !permitted {
                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = %config.name, "circuit open, call fast-failed");
                return Err(CircuitBreakerError::OpenCircuit);
            }

            let outcome = tokio::time::timeout(config.operation_timeout, inner.call(req)).await;

            let mut circuit = circuit.lock().await;
            match outcome {
                Ok(result) => {
                    if (config.failure_classifier)(&result) {
                        circuit.record_failure(&config);
                    } else {
                        circuit.record_success(&config);
                    }
                    result.map_err(CircuitBreakerError::Inner)
                }
                Err(_elapsed) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(breaker = %config.name, timeout = ?config.operation_timeout, "circuit breaker operation timed out");
                    circuit.record_failure(&config);
                    Err(CircuitBreakerError::Timeout)
                }
            }
        })
    }
}
