use thiserror::Error;

/// Errors returned by the `CircuitBreaker` service.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the call was fast-failed without reaching the
    /// inner service.
    #[error("circuit is open; call not permitted")]
    OpenCircuit,

    /// The call exceeded `operation_timeout`. Counted as a failure.
    #[error("operation timed out")]
    Timeout,

    /// An error returned by the inner service.
    #[error("inner service error: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if the error indicates the circuit is open.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit)
    }

    /// Returns true if the error is an operation timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitBreakerError::Timeout)
    }

    /// Returns the inner error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}
