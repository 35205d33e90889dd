//! The `personal-pipeline` binary: the minimal CLI surface of §6 —
//! `start`, `healthcheck`, `version` — and nothing else. The interactive
//! explorer and the HTTP/JSON-RPC transport layer are out of scope; this
//! binary only drives [`pp_orchestrator::Orchestrator`] through its
//! lifecycle and reports the result with the exit codes §6 specifies.

use clap::{Parser, Subcommand};
use pp_orchestrator::{Orchestrator, OrchestratorError};
use std::path::PathBuf;
use std::time::Duration;

/// Grace period `start`'s shutdown waits for in-flight calls to drain once
/// `SIGINT`/`SIGTERM` is observed.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "personal-pipeline", version, about = "Operational knowledge retrieval middleware")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the service and run until interrupted.
    Start,
    /// Bring the service up, report its health once, then exit.
    Healthcheck {
        /// Seconds to wait for the source healthcheck fan-out.
        #[arg(long, default_value_t = 5)]
        deadline_secs: u64,
    },
    /// Print the binary's version and exit.
    Version,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Version => run_version(),
        Command::Start => run_start(&cli.config).await,
        Command::Healthcheck { deadline_secs } => {
            run_healthcheck(&cli.config, Duration::from_secs(deadline_secs)).await
        }
    };
    std::process::exit(code);
}

fn run_version() -> i32 {
    println!("personal-pipeline {}", env!("CARGO_PKG_VERSION"));
    0
}

async fn run_start(config_path: &PathBuf) -> i32 {
    let config = match pp_config::load_from_path(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return 1;
        }
    };

    let orchestrator = match Orchestrator::start(config).await {
        Ok(orchestrator) => orchestrator,
        Err(err) => return report_orchestrator_error(&err),
    };

    tracing::info!("personal-pipeline accepting traffic");
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install Ctrl+C handler; shutting down immediately");
    }

    tracing::info!("shutdown signal received, draining in-flight work");
    orchestrator.shutdown(SHUTDOWN_GRACE_PERIOD).await;
    0
}

async fn run_healthcheck(config_path: &PathBuf, deadline: Duration) -> i32 {
    let config = match pp_config::load_from_path(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return 1;
        }
    };

    let orchestrator = match Orchestrator::start(config).await {
        Ok(orchestrator) => orchestrator,
        Err(err) => return report_orchestrator_error(&err),
    };

    let report = orchestrator.health(deadline).await;
    println!(
        "overall: {:?} (mcp_server_ready={}, cache_healthy={}, sources_healthy={}, performance_healthy={})",
        report.overall,
        report.components.mcp_server_ready,
        report.components.cache_healthy,
        report.components.sources_healthy,
        report.components.performance_healthy,
    );

    let exit_code = report.exit_code();
    orchestrator.shutdown(Duration::from_secs(1)).await;
    exit_code
}

fn report_orchestrator_error(err: &OrchestratorError) -> i32 {
    eprintln!("runtime error: {err}");
    i32::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn healthcheck_deadline_defaults_to_five_seconds() {
        let cli = Cli::parse_from(["personal-pipeline", "healthcheck"]);
        match cli.command {
            Command::Healthcheck { deadline_secs } => assert_eq!(deadline_secs, 5),
            other => panic!("expected Healthcheck, got {other:?}"),
        }
    }

    #[test]
    fn version_subcommand_parses() {
        let cli = Cli::parse_from(["personal-pipeline", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }
}
