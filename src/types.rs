// src/types.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Which units the decision unit depends on once all rounds are done.
///
/// - `AllConnected`: every unit in the graph feeds the decision unit.
/// - `LastConnected`: only the unit executed last in the final round does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum AggregateMode {
    #[default]
    #[serde(rename = "all connected", alias = "all_connected")]
    AllConnected,
    #[serde(rename = "last connected", alias = "last_connected")]
    LastConnected,
}

impl FromStr for AggregateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', " ").as_str() {
            "all connected" => Ok(AggregateMode::AllConnected),
            "last connected" => Ok(AggregateMode::LastConnected),
            other => Err(format!(
                "invalid aggregate_mode: {other} (expected \"all connected\" or \"last connected\")"
            )),
        }
    }
}

impl fmt::Display for AggregateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateMode::AllConnected => f.write_str("all connected"),
            AggregateMode::LastConnected => f.write_str("last connected"),
        }
    }
}

/// What a unit shows its successors after exhausting every retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The unit contributes nothing further this round.
    #[default]
    Silent,
    /// The unit's outputs become a single `{"error": "..."}` object.
    Surface,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "silent" => Ok(FailurePolicy::Silent),
            "surface" => Ok(FailurePolicy::Surface),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"silent\" or \"surface\")"
            )),
        }
    }
}

/// Knobs for one `Graph::run` / `Graph::arun` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub num_rounds: usize,
    /// Attempts per unit per round; must be at least 1.
    pub max_tries: usize,
    pub aggregate_mode: AggregateMode,
    /// Pause between attempts of the same unit.
    pub retry_delay: Option<Duration>,
    pub failure_policy: FailurePolicy,
    /// Async runner only: execute each ready frontier concurrently.
    pub concurrent_frontier: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            num_rounds: 3,
            max_tries: 3,
            aggregate_mode: AggregateMode::default(),
            retry_delay: None,
            failure_policy: FailurePolicy::default(),
            concurrent_frontier: false,
        }
    }
}

impl RunOptions {
    pub fn with_rounds(mut self, num_rounds: usize) -> Self {
        self.num_rounds = num_rounds;
        self
    }

    pub fn with_max_tries(mut self, max_tries: usize) -> Self {
        self.max_tries = max_tries;
        self
    }

    pub fn with_aggregate_mode(mut self, mode: AggregateMode) -> Self {
        self.aggregate_mode = mode;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_concurrent_frontier(mut self, enabled: bool) -> Self {
        self.concurrent_frontier = enabled;
        self
    }
}

/// The two independent edge kinds over the same unit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Resolved within one round against live outputs.
    Spatial,
    /// Resolved against the previous round's memory snapshot.
    Temporal,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Spatial => f.write_str("spatial"),
            EdgeKind::Temporal => f.write_str("temporal"),
        }
    }
}
