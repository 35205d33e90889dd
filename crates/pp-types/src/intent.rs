//! Operational intent classification (§4.6 stage 2).

use serde::{Deserialize, Serialize};

/// The operational purpose a query was classified as serving.
///
/// Drives both the plan deadline (critical intents get a tighter budget)
/// and which adapters are worth calling at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    EmergencyResponse,
    FindRunbook,
    EscalationPath,
    GetProcedure,
    Troubleshoot,
    StatusCheck,
    Configuration,
    GeneralSearch,
}

impl Intent {
    /// Whether this intent is latency-critical, i.e. gets the tightest
    /// plan deadline tier (§4.6 stage 3).
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Intent::EmergencyResponse | Intent::FindRunbook | Intent::EscalationPath
        )
    }

    /// Whether this intent tolerates the relaxed "bulk" deadline tier.
    pub fn is_bulk(&self) -> bool {
        matches!(self, Intent::GeneralSearch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::EmergencyResponse => "emergency_response",
            Intent::FindRunbook => "find_runbook",
            Intent::EscalationPath => "escalation_path",
            Intent::GetProcedure => "get_procedure",
            Intent::Troubleshoot => "troubleshoot",
            Intent::StatusCheck => "status_check",
            Intent::Configuration => "configuration",
            Intent::GeneralSearch => "general_search",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_and_bulk_partition_is_disjoint() {
        for intent in [
            Intent::EmergencyResponse,
            Intent::FindRunbook,
            Intent::EscalationPath,
            Intent::GetProcedure,
            Intent::Troubleshoot,
            Intent::StatusCheck,
            Intent::Configuration,
            Intent::GeneralSearch,
        ] {
            assert!(!(intent.is_critical() && intent.is_bulk()));
        }
    }
}
