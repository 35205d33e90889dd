use crate::events::CircuitBreakerEvent;
use crate::SharedFailureClassifier;
use pp_core::EventListeners;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a per-dependency circuit breaker.
pub struct CircuitBreakerConfig<Res, Err> {
    pub(crate) failure_threshold: usize,
    pub(crate) monitoring_window: Duration,
    pub(crate) success_threshold: usize,
    pub(crate) recovery_timeout: Duration,
    pub(crate) operation_timeout: Duration,
    pub(crate) failure_classifier: SharedFailureClassifier<Res, Err>,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl<Res, Err> CircuitBreakerConfig<Res, Err> {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder<Res, Err> {
        CircuitBreakerConfigBuilder::new()
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder<Res, Err> {
    failure_threshold: usize,
    monitoring_window: Duration,
    success_threshold: usize,
    recovery_timeout: Duration,
    operation_timeout: Duration,
    failure_classifier: SharedFailureClassifier<Res, Err>,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl<Res, Err> CircuitBreakerConfigBuilder<Res, Err> {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            monitoring_window: Duration::from_secs(300),
            success_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(30),
            failure_classifier: Arc::new(|res| res.is_err()),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Number of failures within `monitoring_window` that trips the circuit.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, count: usize) -> Self {
        self.failure_threshold = count;
        self
    }

    /// Rolling window over which failures are counted toward `failure_threshold`.
    ///
    /// Failures older than this are pruned whenever a new failure is recorded.
    ///
    /// Default: 300 seconds
    pub fn monitoring_window(mut self, window: Duration) -> Self {
        self.monitoring_window = window;
        self
    }

    /// Consecutive successes in HALF_OPEN required to close the circuit.
    ///
    /// Default: 3
    pub fn success_threshold(mut self, count: usize) -> Self {
        self.success_threshold = count;
        self
    }

    /// Duration the circuit stays OPEN before allowing a trial call in HALF_OPEN.
    ///
    /// Default: 60 seconds
    pub fn recovery_timeout(mut self, duration: Duration) -> Self {
        self.recovery_timeout = duration;
        self
    }

    /// Deadline applied to every call through `execute`. A call that exceeds this
    /// is recorded as a failure.
    ///
    /// Default: 30 seconds
    pub fn operation_timeout(mut self, duration: Duration) -> Self {
        self.operation_timeout = duration;
        self
    }

    /// Sets a custom failure classifier function.
    ///
    /// Default: classifies every `Err` as a failure.
    pub fn failure_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&Result<Res, Err>) -> bool + Send + Sync + 'static,
    {
        self.failure_classifier = Arc::new(classifier);
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Register a callback for state_change events.
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState, crate::CircuitState) + Send + Sync + 'static,
    {
        use pp_core::FnListener;
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateChange {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Register a callback for call-permitted events.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(pp_core::FnListener::new(
                move |event: &CircuitBreakerEvent| {
                    if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                        f(*state);
                    }
                },
            ));
        self
    }

    /// Register a callback for fallback events (fast-fail while OPEN).
    pub fn on_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(pp_core::FnListener::new(
                move |event: &CircuitBreakerEvent| {
                    if matches!(event, CircuitBreakerEvent::Fallback { .. }) {
                        f();
                    }
                },
            ));
        self
    }

    /// Register a callback for success-recorded events.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(pp_core::FnListener::new(
                move |event: &CircuitBreakerEvent| {
                    if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                        f(*state);
                    }
                },
            ));
        self
    }

    /// Register a callback for failure-recorded events.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(pp_core::FnListener::new(
                move |event: &CircuitBreakerEvent| {
                    if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                        f(*state);
                    }
                },
            ));
        self
    }

    /// Builds the configuration and returns a `CircuitBreakerLayer`.
    pub fn build(self) -> crate::layer::CircuitBreakerLayer<Res, Err> {
        let config = CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            monitoring_window: self.monitoring_window,
            success_threshold: self.success_threshold,
            recovery_timeout: self.recovery_timeout,
            operation_timeout: self.operation_timeout,
            failure_classifier: self.failure_classifier,
            event_listeners: self.event_listeners,
            name: self.name,
        };

        crate::layer::CircuitBreakerLayer::new(config)
    }
}

impl<Res, Err> Default for CircuitBreakerConfigBuilder<Res, Err> {
    fn default() -> Self {
        Self::new()
    }
}
