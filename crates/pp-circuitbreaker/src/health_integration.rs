//! Lets the health aggregator (C8) proactively trip or reset a breaker
//! instead of only reacting to failed calls.

use crate::circuit::Circuit;
use crate::config::CircuitBreakerConfig;
use crate::CircuitBreaker;
use pp_core::HealthTriggerable;
use std::sync::Arc;
use tokio::sync::Mutex;

fn trigger_unhealthy_impl<Res, Err>(
    circuit: Arc<Mutex<Circuit>>,
    config: Arc<CircuitBreakerConfig<Res, Err>>,
) where
    Res: Send + Sync + 'static,
    Err: Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut circuit = circuit.lock().await;
        circuit.force_open(&config);
    });
}

fn trigger_healthy_impl<Res, Err>(
    circuit: Arc<Mutex<Circuit>>,
    config: Arc<CircuitBreakerConfig<Res, Err>>,
) where
    Res: Send + Sync + 'static,
    Err: Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut circuit = circuit.lock().await;
        circuit.force_closed(&config);
    });
}

impl<S, Res, Err> HealthTriggerable for CircuitBreaker<S, Res, Err>
where
    S: Send + Sync + 'static,
    Res: Send + Sync + 'static,
    Err: Send + Sync + 'static,
{
    fn trigger_unhealthy(&self) {
        trigger_unhealthy_impl(Arc::clone(&self.circuit), Arc::clone(&self.config));
    }

    fn trigger_healthy(&self) {
        trigger_healthy_impl(Arc::clone(&self.circuit), Arc::clone(&self.config));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitState;
    use crate::CircuitBreaker;
    use pp_core::EventListeners;
    use std::time::Duration;

    fn dummy_config() -> CircuitBreakerConfig<(), ()> {
        CircuitBreakerConfig {
            failure_threshold: 5,
            monitoring_window: Duration::from_secs(60),
            success_threshold: 1,
            recovery_timeout: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(10),
            failure_classifier: Arc::new(|r| r.is_err()),
            event_listeners: EventListeners::new(),
            name: "test".into(),
        }
    }

    #[tokio::test]
    async fn test_health_triggerable_opens_circuit() {
        let config = Arc::new(dummy_config());
        let breaker: CircuitBreaker<(), (), ()> = CircuitBreaker::new((), config);

        assert_eq!(breaker.state_sync(), CircuitState::Closed);

        breaker.trigger_unhealthy();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(breaker.state_sync(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_health_triggerable_closes_circuit() {
        let config = Arc::new(dummy_config());
        let breaker: CircuitBreaker<(), (), ()> = CircuitBreaker::new((), config);

        breaker.force_open().await;
        assert_eq!(breaker.state_sync(), CircuitState::Open);

        breaker.trigger_healthy();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(breaker.state_sync(), CircuitState::Closed);
    }
}
