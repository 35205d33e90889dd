//! Structured operational documents (§3 `Runbook`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One node in a runbook's decision tree. `next_step` references must
/// resolve to a known `ProcedureStep::id` within the same runbook; the
/// tree as a whole must be acyclic (enforced by [`Runbook::validate`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionBranch {
    pub id: String,
    pub question: String,
    /// Branch taken for each possible answer, mapping the answer label to
    /// either another branch id or a terminal procedure step id.
    pub branches: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureStep {
    pub id: String,
    pub description: String,
    pub command: Option<String>,
    pub expected_outcome: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationLevel {
    pub level: u32,
    pub role: String,
    pub contact: String,
    pub wait_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPath {
    pub levels: Vec<EscalationLevel>,
    pub communication_channels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunbookMetadata {
    pub confidence: f64,
    pub success_rate: f64,
    pub avg_resolution_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runbook {
    pub id: String,
    pub title: String,
    pub version: String,
    pub triggers: Vec<String>,
    /// Keyed by the severity tag's string form (`"low"`/`"medium"`/
    /// `"high"`/`"critical"`) rather than [`Severity`] directly — most
    /// serde-backed formats only support string map keys.
    pub severity_mapping: HashMap<String, String>,
    pub decision_tree: Vec<DecisionBranch>,
    pub procedures: Vec<ProcedureStep>,
    pub escalation_path: Option<EscalationPath>,
    pub metadata: RunbookMetadata,
}

/// Error returned by [`Runbook::validate`] when the decision tree violates
/// the acyclic/resolvable invariant from §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunbookValidationError {
    DanglingReference { from: String, to: String },
    Cycle { path: Vec<String> },
}

impl std::fmt::Display for RunbookValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunbookValidationError::DanglingReference { from, to } => {
                write!(f, "branch '{from}' references unknown step '{to}'")
            }
            RunbookValidationError::Cycle { path } => {
                write!(f, "decision tree cycle: {}", path.join(" -> "))
            }
        }
    }
}

impl std::error::Error for RunbookValidationError {}

impl Runbook {
    /// Checks the decision tree's two invariants: every `next_step`
    /// reference resolves to a known branch or procedure step id, and the
    /// branch graph contains no cycle.
    pub fn validate(&self) -> Result<(), RunbookValidationError> {
        let branch_ids: std::collections::HashSet<&str> =
            self.decision_tree.iter().map(|b| b.id.as_str()).collect();
        let step_ids: std::collections::HashSet<&str> =
            self.procedures.iter().map(|s| s.id.as_str()).collect();

        for branch in &self.decision_tree {
            for target in branch.branches.values() {
                if !branch_ids.contains(target.as_str()) && !step_ids.contains(target.as_str()) {
                    return Err(RunbookValidationError::DanglingReference {
                        from: branch.id.clone(),
                        to: target.clone(),
                    });
                }
            }
        }

        for start in &self.decision_tree {
            let mut visited = vec![start.id.clone()];
            self.check_cycle(&start.id, &mut visited)?;
        }
        Ok(())
    }

    fn check_cycle(
        &self,
        current: &str,
        path: &mut Vec<String>,
    ) -> Result<(), RunbookValidationError> {
        let Some(branch) = self.decision_tree.iter().find(|b| b.id == current) else {
            return Ok(());
        };
        for target in branch.branches.values() {
            if path.contains(target) {
                let mut full_path = path.clone();
                full_path.push(target.clone());
                return Err(RunbookValidationError::Cycle { path: full_path });
            }
            if self.decision_tree.iter().any(|b| &b.id == target) {
                path.push(target.clone());
                self.check_cycle(target, path)?;
                path.pop();
            }
        }
        Ok(())
    }
}
