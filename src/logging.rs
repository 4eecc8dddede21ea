// src/logging.rs

//! Logging setup for `agentgraph` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level`, which sets the level of the `agentgraph` target only
//! 2. `AGENTGRAPH_LOG`, either a bare level (`debug`) scoped the same way, or
//!    full `EnvFilter` directives such as
//!    `agentgraph::graph::scheduler=debug,agentgraph::graph::builder=trace`
//! 3. `agentgraph=info`
//!
//! Other crates stay at `warn` unless a directive names them. Logs go to
//! stderr so stdout carries only the run result.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "AGENTGRAPH_LOG";

const CRATE_TARGET: &str = "agentgraph";

/// Initialise the global subscriber. Fails if one is already installed or
/// `AGENTGRAPH_LOG` holds invalid directives.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

/// Directive string for the given sources; see the module docs for priority.
fn directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return crate_scoped(level_name(level));
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match bare_level(raw) {
            Some(level) => crate_scoped(level),
            None => raw.to_string(),
        },
        None => crate_scoped("info"),
    }
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let spec = directives(cli_level, env);
    EnvFilter::try_new(&spec).with_context(|| format!("invalid {LOG_ENV} directives: {spec:?}"))
}

fn crate_scoped(level: &str) -> String {
    format!("warn,{CRATE_TARGET}={level}")
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn bare_level(s: &str) -> Option<&'static str> {
    match s.to_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}
