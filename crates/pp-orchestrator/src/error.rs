//! Errors the orchestrator's startup sequence can fail with. A failed
//! startup is always fail-fast (§4.9): the first unrecoverable step aborts
//! the rest of the sequence rather than continuing in a partially-built
//! state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("configuration error: {0}")]
    Config(#[from] pp_config::ConfigError),

    /// `create_all` produced zero live adapters — every configured source
    /// failed construction or initialization. Per-source failures alone are
    /// not fatal (§4.9 "construct adapters, best-effort, log failures");
    /// this is the one aggregate condition that is.
    #[error("no source adapters could be constructed: {0:?}")]
    NoLiveSources(Vec<(String, String)>),
}

impl From<&OrchestratorError> for i32 {
    fn from(err: &OrchestratorError) -> i32 {
        match err {
            OrchestratorError::Config(_) => 1,
            OrchestratorError::NoLiveSources(_) => 2,
        }
    }
}
