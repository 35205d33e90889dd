//! Adapter health records (§3 `HealthCheck`).

use serde::{Deserialize, Serialize};

/// Result of one adapter's `healthcheck` call. Created on demand by the
/// adapter, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub source_name: String,
    pub healthy: bool,
    pub response_time_ms: u64,
    pub last_check: chrono::DateTime<chrono::Utc>,
    pub error_message: Option<String>,
}

impl HealthCheck {
    pub fn healthy(source_name: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            source_name: source_name.into(),
            healthy: true,
            response_time_ms,
            last_check: chrono::Utc::now(),
            error_message: None,
        }
    }

    pub fn unhealthy(source_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            healthy: false,
            response_time_ms: 0,
            last_check: chrono::Utc::now(),
            error_message: Some(error_message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unhealthy_always_carries_an_error_message() {
        let hc = HealthCheck::unhealthy("wiki", "connection refused");
        assert!(!hc.healthy);
        assert!(hc.error_message.is_some());
    }
}
