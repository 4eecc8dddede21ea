// src/lib.rs

pub mod agents;
pub mod answer;
pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod llm;
pub mod logging;
pub mod prompt;
pub mod types;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::agents::AgentRegistry;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::graph::{Graph, RunOutcome};
use crate::types::{EdgeKind, RunOptions};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the agent registry and graph construction
/// - the sync or async runner
/// - JSON output on stdout
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let mut cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    apply_overrides(&mut cfg, &args);

    let registry = AgentRegistry::with_builtin_agents();
    let mut graph = Graph::from_config(&cfg, &registry)?;

    if args.dry_run {
        print_dry_run(&cfg, &mut graph);
        return Ok(());
    }

    let input = cfg.input_value()?;
    let options = run_options(&cfg, &args);
    info!(sync = args.sync, agents = graph.len(), "starting agent graph");

    let outcome = if args.sync {
        graph.run(&input, &options)?
    } else {
        graph.arun(&input, &options).await?
    };

    println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
    Ok(())
}

/// Fold CLI flags into the loaded config.
fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(ref task) = args.task {
        cfg.input
            .insert("task".to_string(), toml::Value::String(task.clone()));
    }
    if let Some(mode) = args.mode {
        cfg.graph.mode = Some(mode);
    }
    if let Some(mode) = args.aggregate_mode {
        cfg.run.aggregate_mode = mode;
    }
}

fn run_options(cfg: &ConfigFile, args: &CliArgs) -> RunOptions {
    let mut options = cfg.run.to_options();
    if let Some(rounds) = args.rounds {
        options.num_rounds = rounds;
    }
    if let Some(tries) = args.max_tries {
        options.max_tries = tries;
    }
    options
}

/// What the binary prints: the answers and the auxiliary score.
pub fn outcome_json(outcome: &RunOutcome) -> Value {
    json!({
        "answers": outcome.answers,
        "log_prob": outcome.log_prob,
        "rounds": outcome
            .rounds
            .iter()
            .map(|r| json!({
                "round": r.round,
                "executed": r.executed,
                "failed": r.failed,
            }))
            .collect::<Vec<_>>(),
    })
}

/// Print agents and the round-0 edges without executing anything.
fn print_dry_run(cfg: &ConfigFile, graph: &mut Graph) {
    println!("agentgraph dry-run");
    println!("  run.rounds = {}", cfg.run.rounds);
    println!("  run.max_tries = {}", cfg.run.max_tries);
    println!("  run.aggregate_mode = {}", cfg.run.aggregate_mode);
    println!("  graph.llm = {}", cfg.graph.llm);
    if let Some(mode) = cfg.graph.mode {
        println!("  graph.mode = {mode}");
    }
    println!();

    println!("agents ({}):", graph.len());
    for unit in graph.arena().units() {
        println!("  - {} ({}) role: {}", unit.id(), unit.agent_name(), unit.role());
    }
    println!(
        "  decision: {} ({})",
        graph.decision().id(),
        graph.decision().agent_name()
    );

    let log_prob = graph.build_round(0);
    println!();
    println!("spatial edges (round 0):");
    for (from, to) in graph.arena().edges(EdgeKind::Spatial) {
        println!("  {from} -> {to}");
    }
    if graph.topology().weights.is_some() {
        println!("  log_prob = {log_prob:.4}");
    }
    println!("temporal edges start at round 1.");

    debug!("dry-run complete (no execution)");
}
