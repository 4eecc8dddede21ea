// src/graph/graph.rs

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::agents::registry::{AgentArgs, AgentRegistry};
use crate::config::model::ConfigFile;
use crate::errors::{GraphError, Result};
use crate::graph::arena::UnitArena;
use crate::graph::builder::ConnectionBuilder;
use crate::graph::scheduler::{RoundExecutor, RoundReport};
use crate::graph::topology::Topology;
use crate::graph::unit::{Unit, UnitId, generate_unit_id};
use crate::llm::resolve_model;
use crate::types::{AggregateMode, EdgeKind, RunOptions};

/// Result substituted when the decision unit produces nothing.
pub const NO_ANSWER: &str = "No answer found";

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Outputs of the decision unit; never empty.
    pub answers: Vec<Value>,
    /// Auxiliary score summed over every round's spatial build.
    pub log_prob: f64,
    pub rounds: Vec<RoundReport>,
}

/// A set of units, a decision unit and the topology wiring them.
///
/// The decision unit lives outside the arena: regular units point at it
/// through external successor links, which the scheduler skips.
#[derive(Debug)]
pub struct Graph {
    arena: UnitArena,
    decision: Unit,
    topology: Topology,
}

impl Graph {
    /// Build a graph, checking the topology against the unit count.
    pub fn new(units: Vec<Unit>, mut decision: Unit, topology: Topology) -> Result<Self> {
        let mut arena = UnitArena::new();
        for unit in units {
            arena.insert(unit);
        }
        topology.validate_for(arena.len())?;

        while arena.contains(decision.id()) {
            decision.set_id(generate_unit_id());
        }

        debug!(
            units = arena.len(),
            decision = %decision.id(),
            "graph constructed"
        );

        Ok(Self {
            arena,
            decision,
            topology,
        })
    }

    /// Build the graph a validated config describes, resolving every agent
    /// through `registry`.
    pub fn from_config(cfg: &ConfigFile, registry: &AgentRegistry) -> Result<Self> {
        let llm = resolve_model(&cfg.graph.llm)?;

        let mut units = Vec::with_capacity(cfg.agents.len());
        for (index, agent) in cfg.agents.iter().enumerate() {
            let args = AgentArgs {
                index,
                id: agent.id.clone(),
                role: agent.role.clone(),
                domain: cfg.graph.domain.clone(),
                llm: Some(llm.clone()),
            };
            units.push(registry.resolve(&agent.name, &args)?);
        }

        let decision_args = AgentArgs::new(units.len())
            .with_domain(cfg.graph.domain.clone())
            .with_llm(llm);
        let decision = registry.resolve(&cfg.graph.decision, &decision_args)?;

        Self::new(units, decision, cfg.topology()?)
    }

    pub fn arena(&self) -> &UnitArena {
        &self.arena
    }

    pub fn decision(&self) -> &Unit {
        &self.decision
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Materialise edges for `round` and return the spatial score.
    ///
    /// Useful for inspecting a topology without executing anything.
    pub fn build_round(&mut self, round: usize) -> f64 {
        let log_prob = ConnectionBuilder::build_spatial(&mut self.arena, &self.topology);
        ConnectionBuilder::build_temporal(&mut self.arena, &self.topology, round);
        log_prob
    }

    fn check_options(options: &RunOptions) -> Result<()> {
        if options.max_tries == 0 {
            return Err(GraphError::Config("max_tries must be at least 1".to_string()));
        }
        if options.num_rounds == 0 {
            return Err(GraphError::Config("num_rounds must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Blocking run: every round, then a single attempt of the decision unit.
    ///
    /// Per-unit failures never surface here; only misconfiguration does.
    pub fn run(&mut self, input: &Value, options: &RunOptions) -> Result<RunOutcome> {
        Self::check_options(options)?;
        let executor = RoundExecutor::new(options);
        info!(
            units = self.arena.len(),
            rounds = options.num_rounds,
            mode = %options.aggregate_mode,
            "graph run started"
        );

        let mut log_prob = 0.0;
        let mut rounds = Vec::with_capacity(options.num_rounds);
        for round in 0..options.num_rounds {
            log_prob += self.build_round(round);
            rounds.push(executor.run_round(&mut self.arena, round, input));
        }

        let last_unit = rounds.last().and_then(|r| r.last_unit.clone());
        self.connect_decision(options.aggregate_mode, last_unit.as_deref());

        let neighbours = self.arena.collect_dependency_info(self.decision.connections());
        executor
            .single_attempt()
            .execute_with_retries(&mut self.decision, input, &neighbours);

        Ok(self.finish(log_prob, rounds))
    }

    /// Non-blocking counterpart of [`Graph::run`].
    pub async fn arun(&mut self, input: &Value, options: &RunOptions) -> Result<RunOutcome> {
        Self::check_options(options)?;
        let executor = RoundExecutor::new(options);
        info!(
            units = self.arena.len(),
            rounds = options.num_rounds,
            mode = %options.aggregate_mode,
            concurrent = options.concurrent_frontier,
            "graph run started"
        );

        let mut log_prob = 0.0;
        let mut rounds = Vec::with_capacity(options.num_rounds);
        for round in 0..options.num_rounds {
            log_prob += self.build_round(round);
            rounds.push(executor.run_round_async(&mut self.arena, round, input).await);
        }

        let last_unit = rounds.last().and_then(|r| r.last_unit.clone());
        self.connect_decision(options.aggregate_mode, last_unit.as_deref());

        let neighbours = self.arena.collect_dependency_info(self.decision.connections());
        executor
            .single_attempt()
            .execute_with_retries_async(&mut self.decision, input, &neighbours)
            .await;

        Ok(self.finish(log_prob, rounds))
    }

    /// Wire the decision unit as a spatial successor of the selected units.
    fn connect_decision(&mut self, mode: AggregateMode, last_unit: Option<&str>) {
        self.decision.connections_mut().clear_all();

        let sources: Vec<UnitId> = match mode {
            AggregateMode::AllConnected => self.arena.ids(),
            AggregateMode::LastConnected => last_unit.map(str::to_string).into_iter().collect(),
        };

        let decision_id = self.decision.id().to_string();
        for source in sources {
            if self.arena.link_external_successor(&source, &decision_id) {
                self.decision
                    .connections_mut()
                    .predecessors_mut(EdgeKind::Spatial)
                    .push(source);
            }
        }

        debug!(
            %mode,
            predecessors = self.decision.connections().spatial_predecessors.len(),
            "decision unit connected"
        );
    }

    fn finish(&self, log_prob: f64, rounds: Vec<RoundReport>) -> RunOutcome {
        let mut answers = self.decision.outputs().to_vec();
        if answers.is_empty() {
            debug!("decision unit produced nothing; using placeholder");
            answers.push(json!(NO_ANSWER));
        }
        info!(answers = answers.len(), log_prob, "graph run finished");
        RunOutcome {
            answers,
            log_prob,
            rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::topology::{Mask, TopologyMode};
    use crate::graph::unit::{Agent, AgentOutput, ExecutionContext, NeighbourInfo};
    use anyhow::Result;
    use futures::future::BoxFuture;

    /// Emits its own id.
    struct Echo;

    impl Agent for Echo {
        fn process_inputs(&self, _: &Value, _: &NeighbourInfo) -> Result<Vec<Value>> {
            Ok(vec![])
        }

        fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
            Ok(AgentOutput::text(ctx.unit_id))
        }

        fn execute_async<'a>(
            &'a self,
            ctx: &'a ExecutionContext<'a>,
        ) -> BoxFuture<'a, Result<AgentOutput>> {
            Box::pin(async move { self.execute(ctx) })
        }
    }

    /// Returns the ids of every spatial peer it saw.
    struct Collect;

    impl Agent for Collect {
        fn process_inputs(&self, _: &Value, _: &NeighbourInfo) -> Result<Vec<Value>> {
            Ok(vec![])
        }

        fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
            Ok(AgentOutput::Batch(
                ctx.neighbours.spatial.iter().map(|p| p.output.clone()).collect(),
            ))
        }

        fn execute_async<'a>(
            &'a self,
            ctx: &'a ExecutionContext<'a>,
        ) -> BoxFuture<'a, Result<AgentOutput>> {
            Box::pin(async move { self.execute(ctx) })
        }
    }

    fn graph(n: usize, topology: Topology) -> Graph {
        let units = (0..n)
            .map(|i| Unit::new(Some(format!("u{i}")), "echo", "Echo", Box::new(Echo)))
            .collect();
        let decision = Unit::new(Some("d".into()), "collect", "Decision", Box::new(Collect));
        Graph::new(units, decision, topology).unwrap()
    }

    #[test]
    fn rejects_mismatched_topology() {
        let units = vec![Unit::new(None, "echo", "Echo", Box::new(Echo))];
        let decision = Unit::new(None, "collect", "Decision", Box::new(Collect));
        let topology = Topology::preset(TopologyMode::Chain, 2, None);
        assert!(matches!(
            Graph::new(units, decision, topology),
            Err(GraphError::Topology(_))
        ));
    }

    #[test]
    fn decision_id_never_collides_with_units() {
        let units = vec![Unit::new(Some("x".into()), "echo", "Echo", Box::new(Echo))];
        let decision = Unit::new(Some("x".into()), "collect", "Decision", Box::new(Collect));
        let g = Graph::new(units, decision, Topology::preset(TopologyMode::Debate, 1, None)).unwrap();
        assert_ne!(g.decision().id(), "x");
    }

    #[test]
    fn zero_max_tries_is_a_config_error() {
        let mut g = graph(1, Topology::preset(TopologyMode::Debate, 1, None));
        let err = g
            .run(&json!(null), &RunOptions::default().with_max_tries(0))
            .unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn all_connected_sees_every_unit() {
        let mut g = graph(3, Topology::preset(TopologyMode::Chain, 3, None));
        let outcome = g
            .run(&json!({"task": "t"}), &RunOptions::default().with_rounds(1))
            .unwrap();
        assert_eq!(outcome.answers, vec![json!("u0"), json!("u1"), json!("u2")]);
        assert_eq!(outcome.rounds[0].executed, vec!["u0", "u1", "u2"]);
    }

    #[test]
    fn last_connected_sees_only_final_unit() {
        let mut g = graph(3, Topology::preset(TopologyMode::Chain, 3, None));
        let opts = RunOptions::default()
            .with_rounds(2)
            .with_aggregate_mode(AggregateMode::LastConnected);
        let outcome = g.run(&json!(null), &opts).unwrap();
        assert_eq!(outcome.answers, vec![json!("u2")]);
    }

    #[test]
    fn empty_graph_yields_placeholder() {
        let mut g = graph(0, Topology::new(Mask::zeros(0), Mask::zeros(0)));
        let outcome = g.run(&json!(null), &RunOptions::default()).unwrap();
        assert_eq!(outcome.answers, vec![json!(NO_ANSWER)]);
        assert!(outcome.rounds.iter().all(|r| r.executed.is_empty()));
    }

    #[test]
    fn repeated_runs_do_not_accumulate_decision_links() {
        let mut g = graph(2, Topology::preset(TopologyMode::Debate, 2, None));
        let opts = RunOptions::default().with_rounds(1);
        g.run(&json!(null), &opts).unwrap();
        let outcome = g.run(&json!(null), &opts).unwrap();
        assert_eq!(outcome.answers.len(), 2);
        assert_eq!(g.decision().connections().spatial_predecessors.len(), 2);
    }

    #[tokio::test]
    async fn async_run_matches_sync_for_chain() {
        let mut g = graph(3, Topology::preset(TopologyMode::Chain, 3, None));
        let outcome = g
            .arun(&json!(null), &RunOptions::default().with_rounds(1))
            .await
            .unwrap();
        assert_eq!(outcome.rounds[0].executed, vec!["u0", "u1", "u2"]);
        assert_eq!(outcome.answers.len(), 3);
    }
}
