// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::Result;
use crate::graph::topology::{EdgeWeights, Mask, Topology, TopologyMode};
use crate::types::{AggregateMode, FailurePolicy, RunOptions};

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// [run]
/// rounds = 2
/// aggregate_mode = "last connected"
///
/// [graph]
/// mode = "chain"
/// decision = "FinalRefer"
///
/// [[agent]]
/// name = "normalAgent"
///
/// [[agent]]
/// name = "MathSolver"
/// id = "math"
///
/// [input]
/// task = "What is 6 * 7?"
/// ```
///
/// Every section is optional; `[[agent]]` must appear at least once to pass
/// validation.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub graph: GraphSection,

    /// `[[agent]]` entries, in graph order.
    #[serde(default, rename = "agent")]
    pub agents: Vec<AgentConfig>,

    /// Free-form run input.
    #[serde(default)]
    pub input: toml::Table,
}

/// A validated configuration. Obtain one through
/// [`load_and_validate`](crate::config::load_and_validate) or `TryFrom`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub run: RunSection,
    pub graph: GraphSection,
    pub agents: Vec<AgentConfig>,
    pub input: toml::Table,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            run: raw.run,
            graph: raw.graph,
            agents: raw.agents,
            input: raw.input,
        }
    }

    /// The `[input]` table as a JSON value.
    pub fn input_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.input)?)
    }

    /// Materialise the topology descriptor for the configured agents.
    ///
    /// Explicit masks override the preset, one kind at a time.
    pub fn topology(&self) -> Result<Topology> {
        self.graph.topology(self.agents.len())
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    #[serde(default = "default_rounds")]
    pub rounds: usize,

    #[serde(default = "default_max_tries")]
    pub max_tries: usize,

    /// `"all connected"` or `"last connected"`.
    #[serde(default)]
    pub aggregate_mode: AggregateMode,

    /// Pause between attempts of the same unit, in milliseconds.
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Run each ready frontier concurrently (async runner only).
    #[serde(default)]
    pub concurrent_frontier: bool,
}

fn default_rounds() -> usize {
    3
}

fn default_max_tries() -> usize {
    3
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            max_tries: default_max_tries(),
            aggregate_mode: AggregateMode::default(),
            retry_delay_ms: None,
            failure_policy: FailurePolicy::default(),
            concurrent_frontier: false,
        }
    }
}

impl RunSection {
    pub fn to_options(&self) -> RunOptions {
        RunOptions {
            num_rounds: self.rounds,
            max_tries: self.max_tries,
            aggregate_mode: self.aggregate_mode,
            retry_delay: self.retry_delay_ms.map(Duration::from_millis),
            failure_policy: self.failure_policy,
            concurrent_frontier: self.concurrent_frontier,
        }
    }
}

/// `[graph]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSection {
    /// Free-text domain label handed to every agent factory.
    #[serde(default)]
    pub domain: String,

    /// Language model name, resolved through `llm::resolve_model`.
    #[serde(default = "default_llm")]
    pub llm: String,

    /// Registered name of the decision agent.
    #[serde(default = "default_decision")]
    pub decision: String,

    /// Preset used for any mask not given explicitly.
    #[serde(default)]
    pub mode: Option<TopologyMode>,

    /// Seed for the `random` preset.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub spatial_mask: Option<Vec<Vec<u8>>>,

    #[serde(default)]
    pub temporal_mask: Option<Vec<Vec<u8>>>,

    /// Optional logits for pruning spatial edges.
    #[serde(default)]
    pub spatial_logits: Option<Vec<Vec<f64>>>,

    /// Keep threshold for `spatial_logits`; defaults to 0.5.
    #[serde(default)]
    pub prune_threshold: Option<f64>,
}

fn default_llm() -> String {
    "mock".to_string()
}

fn default_decision() -> String {
    "FinalRefer".to_string()
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            domain: String::new(),
            llm: default_llm(),
            decision: default_decision(),
            mode: None,
            seed: None,
            spatial_mask: None,
            temporal_mask: None,
            spatial_logits: None,
            prune_threshold: None,
        }
    }
}

impl GraphSection {
    pub(crate) fn topology(&self, units: usize) -> Result<Topology> {
        let preset = self.mode.map(|m| Topology::preset(m, units, self.seed));

        let spatial = match (self.spatial_mask.as_ref(), preset.as_ref()) {
            (Some(rows), _) => Mask::from_rows(rows)?,
            (None, Some(p)) => p.spatial.clone(),
            (None, None) => Mask::zeros(units),
        };
        let temporal = match (self.temporal_mask.as_ref(), preset.as_ref()) {
            (Some(rows), _) => Mask::from_rows(rows)?,
            (None, Some(p)) => p.temporal.clone(),
            (None, None) => Mask::zeros(units),
        };

        let mut topology = Topology::new(spatial, temporal);
        if let Some(ref logits) = self.spatial_logits {
            let threshold = self
                .prune_threshold
                .unwrap_or(EdgeWeights::DEFAULT_THRESHOLD);
            topology = topology.with_weights(EdgeWeights::new(logits.clone()).with_threshold(threshold));
        }
        Ok(topology)
    }
}

/// One `[[agent]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Registered agent name, e.g. `"normalAgent"`.
    pub name: String,

    /// Role label; the agent picks its own when omitted.
    #[serde(default)]
    pub role: Option<String>,

    /// Fixed unit id; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
}
