//! Shared data model for Personal Pipeline.
//!
//! Every other crate in the workspace (adapters, registry, pipeline, tools)
//! exchanges values of these types rather than inventing its own. Keeping
//! the model in one leaf crate means `pp-adapter` and `pp-pipeline` can both
//! depend on it without depending on each other.

pub mod document;
pub mod filter;
pub mod health;
pub mod intent;
pub mod runbook;
pub mod source;

pub use document::{Category, Document, SearchResult};
pub use filter::Filter;
pub use health::HealthCheck;
pub use intent::Intent;
pub use runbook::{DecisionBranch, EscalationLevel, EscalationPath, ProcedureStep, Runbook, Severity};
pub use source::{SourceConfig, SourceKind, SourceSettings};
