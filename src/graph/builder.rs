// src/graph/builder.rs

//! Materialise a [`Topology`] into live edges.
//!
//! The builder holds no state between calls: given the same units, the same
//! masks and the same round index it always produces the same edge sets.

use tracing::debug;

use crate::graph::arena::UnitArena;
use crate::graph::topology::Topology;
use crate::types::EdgeKind;

/// Stateless translator from topology descriptor to edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionBuilder;

impl ConnectionBuilder {
    /// Clear and rebuild spatial edges.
    ///
    /// Returns this round's contribution to the auxiliary score: the sum of
    /// `ln(p)` for kept edges and `ln(1 - p)` for pruned ones when the
    /// topology carries [`EdgeWeights`](crate::graph::topology::EdgeWeights),
    /// `0.0` otherwise.
    pub fn build_spatial(arena: &mut UnitArena, topology: &Topology) -> f64 {
        arena.clear_edges(EdgeKind::Spatial);

        let ids = arena.ids();
        let mut log_prob = 0.0;

        for (i, j) in topology.spatial.ones_iter() {
            let (Some(from), Some(to)) = (ids.get(i), ids.get(j)) else {
                continue;
            };

            if let Some(ref weights) = topology.weights {
                let p = weights.probability(i, j);
                if p < weights.threshold {
                    log_prob += (1.0 - p).ln();
                    debug!(%from, %to, p, "spatial edge pruned by weight");
                    continue;
                }
                log_prob += p.ln();
            }

            if let Err(reason) = arena.add_edge(from, to, EdgeKind::Spatial) {
                debug!(%from, %to, ?reason, "spatial edge rejected");
            }
        }

        log_prob
    }

    /// Clear and rebuild temporal edges for `round`.
    ///
    /// Round 0 has no previous round, so it leaves temporal edges empty.
    /// Diagonal entries are dropped; mutual pairs are both kept.
    pub fn build_temporal(arena: &mut UnitArena, topology: &Topology, round: usize) {
        arena.clear_edges(EdgeKind::Temporal);
        if round == 0 {
            return;
        }

        let ids = arena.ids();
        for (i, j) in topology.temporal.ones_iter() {
            let (Some(from), Some(to)) = (ids.get(i), ids.get(j)) else {
                continue;
            };
            if let Err(reason) = arena.add_edge(from, to, EdgeKind::Temporal) {
                debug!(%from, %to, ?reason, "temporal edge rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::topology::{EdgeWeights, Mask, TopologyMode};
    use crate::graph::unit::{Agent, AgentOutput, ExecutionContext, NeighbourInfo, Unit};
    use anyhow::Result;
    use futures::future::BoxFuture;
    use serde_json::Value;

    struct Idle;

    impl Agent for Idle {
        fn process_inputs(&self, _: &Value, _: &NeighbourInfo) -> Result<Vec<Value>> {
            Ok(vec![])
        }

        fn execute(&self, _: &ExecutionContext<'_>) -> Result<AgentOutput> {
            Ok(AgentOutput::empty())
        }

        fn execute_async<'a>(
            &'a self,
            ctx: &'a ExecutionContext<'a>,
        ) -> BoxFuture<'a, Result<AgentOutput>> {
            Box::pin(async move { self.execute(ctx) })
        }
    }

    fn arena(n: usize) -> UnitArena {
        let mut arena = UnitArena::new();
        for i in 0..n {
            arena.insert(Unit::new(Some(format!("u{i}")), "idle", "Idle", Box::new(Idle)));
        }
        arena
    }

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn two_cycle_keeps_only_the_first_edge() {
        let mut arena = arena(2);
        let topology = Topology::from_rows(&[vec![0, 1], vec![1, 0]], &[vec![0, 0], vec![0, 0]])
            .unwrap();

        ConnectionBuilder::build_spatial(&mut arena, &topology);

        assert_eq!(arena.edges(EdgeKind::Spatial), vec![pair("u0", "u1")]);
    }

    #[test]
    fn rebuild_is_deterministic_and_clears_first() {
        let mut arena = arena(4);
        let topology = Topology::preset(TopologyMode::FullConnected, 4, None);

        ConnectionBuilder::build_spatial(&mut arena, &topology);
        let first = arena.edges(EdgeKind::Spatial);
        ConnectionBuilder::build_spatial(&mut arena, &topology);
        let second = arena.edges(EdgeKind::Spatial);

        assert_eq!(first, second);
        // Full connection collapses to the acyclic "i before j" order.
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn temporal_round_zero_is_empty() {
        let mut arena = arena(3);
        let topology = Topology::preset(TopologyMode::Debate, 3, None);

        ConnectionBuilder::build_temporal(&mut arena, &topology, 0);
        assert!(arena.edges(EdgeKind::Temporal).is_empty());

        ConnectionBuilder::build_temporal(&mut arena, &topology, 1);
        // Every ordered pair except self-loops.
        assert_eq!(arena.edges(EdgeKind::Temporal).len(), 6);

        ConnectionBuilder::build_temporal(&mut arena, &topology, 0);
        assert!(arena.edges(EdgeKind::Temporal).is_empty());
    }

    #[test]
    fn weights_prune_edges_and_score_them() {
        let mut arena = arena(2);
        let topology = Topology::new(
            Mask::from_rows(&[vec![0, 1], vec![0, 0]]).unwrap(),
            Mask::zeros(2),
        )
        .with_weights(EdgeWeights::new(vec![vec![0.0, -2.0], vec![0.0, 0.0]]));

        let score = ConnectionBuilder::build_spatial(&mut arena, &topology);

        assert!(arena.edges(EdgeKind::Spatial).is_empty());
        let p = 1.0 / (1.0 + 2.0_f64.exp());
        assert!((score - (1.0 - p).ln()).abs() < 1e-9);
    }

    #[test]
    fn unweighted_topology_scores_zero() {
        let mut arena = arena(3);
        let topology = Topology::preset(TopologyMode::Chain, 3, None);
        assert_eq!(ConnectionBuilder::build_spatial(&mut arena, &topology), 0.0);
    }
}
