// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::loader::default_config_path;

use crate::graph::topology::TopologyMode;
use crate::types::AggregateMode;

/// Command-line arguments for `agentgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "agentgraph",
    version,
    about = "Run a multi-round agent graph and aggregate its answers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Agentgraph.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Task text; overrides `[input].task`.
    #[arg(long, value_name = "TEXT")]
    pub task: Option<String>,

    /// Number of rounds; overrides `[run].rounds`.
    #[arg(long, value_name = "N")]
    pub rounds: Option<usize>,

    /// Attempts per unit per round; overrides `[run].max_tries`.
    #[arg(long, value_name = "N")]
    pub max_tries: Option<usize>,

    /// "all connected" or "last connected".
    #[arg(long, value_name = "MODE")]
    pub aggregate_mode: Option<AggregateMode>,

    /// Topology preset; masks given in the config still take precedence.
    #[arg(long, value_name = "PRESET")]
    pub mode: Option<TopologyMode>,

    /// Use the blocking runner instead of the async one.
    #[arg(long)]
    pub sync: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `AGENTGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print agents and round-0 edges, but don't execute.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
