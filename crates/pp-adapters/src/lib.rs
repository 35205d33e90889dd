//! Concrete [`pp_adapter::SourceAdapter`] implementations for every source
//! kind named in §4.4: file, git-host, wiki, database, web.
//!
//! Each kind wraps its backend client in a circuit breaker
//! ([`pp_circuitbreaker`], via [`support::guard`]/[`support::call`]) and,
//! where the backend publishes a rate quota (git-host, web), a rate limiter
//! ([`pp_ratelimiter`], via [`support::acquire_rate_permit`]). None of them
//! consult [`pp_cache`] directly — that is the registry's job, sitting in
//! front of every adapter's `search`/`get` call.

mod database;
mod file;
mod git_host;
mod support;
mod web;
mod wiki;

pub use database::DatabaseAdapter;
pub use file::FileAdapter;
pub use git_host::GitHostAdapter;
pub use web::WebAdapter;
pub use wiki::WikiAdapter;

use pp_adapter::{AdapterError, AdapterResult, SourceAdapter};
use pp_config::CircuitBreakerDefaults;
use pp_types::{SourceConfig, SourceSettings};
use std::path::PathBuf;

/// Builds the adapter matching one [`SourceConfig`]'s declared kind and
/// settings. The registry's `file`/`git_host`/`wiki`/`database`/`web`
/// factories all funnel through this so there is exactly one place that
/// knows how to turn a config into a concrete adapter. `breaker_defaults`
/// and `config.max_retries` are threaded into every kind that guards its
/// backend calls ([`support::guard`](crate::support::guard)); `web` only
/// rate-limits and does not participate.
///
/// Returns a boxed, not-yet-initialized adapter; the caller (the registry's
/// `create_all`) is responsible for calling
/// [`SourceAdapter::initialize`](pp_adapter::SourceAdapter::initialize)
/// before serving traffic.
pub fn build(
    config: &SourceConfig,
    breaker_defaults: &CircuitBreakerDefaults,
) -> AdapterResult<Box<dyn SourceAdapter>> {
    match &config.settings {
        SourceSettings::File {
            roots,
            include,
            exclude,
            max_depth,
            watch: _,
        } => Ok(Box::new(FileAdapter::new(
            config.name.clone(),
            roots.iter().map(PathBuf::from).collect(),
            include,
            exclude,
            *max_depth,
            config.timeout,
            breaker_defaults,
            config.max_retries,
        ))),
        SourceSettings::GitHost {
            base_url,
            repositories,
            include_issues,
            include_pull_requests,
            rate_budget_fraction,
            min_request_interval_ms,
        } => Ok(Box::new(GitHostAdapter::new(
            config.name.clone(),
            base_url.clone(),
            repositories.clone(),
            *include_issues,
            *include_pull_requests,
            *rate_budget_fraction,
            *min_request_interval_ms,
            config.timeout,
            breaker_defaults,
            config.max_retries,
        ))),
        SourceSettings::Wiki {
            base_url,
            auth,
            spaces,
        } => Ok(Box::new(WikiAdapter::new(
            config.name.clone(),
            base_url.clone(),
            auth,
            spaces.clone(),
            config.timeout,
            breaker_defaults,
            config.max_retries,
        )?)),
        SourceSettings::Database {
            connection_url,
            tables,
            pool_size,
            detect_schema: _,
        } => Ok(Box::new(DatabaseAdapter::new(
            config.name.clone(),
            connection_url.clone(),
            tables.clone(),
            *pool_size,
            config.timeout,
            breaker_defaults,
            config.max_retries,
        ))),
        SourceSettings::Web {
            endpoints,
            respect_robots_txt,
            rate_budget_fraction,
        } => Ok(Box::new(WebAdapter::new(
            config.name.clone(),
            endpoints.clone(),
            *respect_robots_txt,
            *rate_budget_fraction,
            config.timeout,
        ))),
    }
}

/// Resolves a [`pp_types::CredentialRef`] against the process environment,
/// the way every wiki/git-host/database credential is documented to work
/// (§6 "Environment variables").
pub fn resolve_credential(env_var: &str) -> AdapterResult<String> {
    std::env::var(env_var)
        .map_err(|_| AdapterError::AuthError(format!("environment variable {env_var} is not set")))
}
