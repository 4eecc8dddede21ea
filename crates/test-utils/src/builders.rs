#![allow(dead_code)]

use agentgraph::graph::topology::{EdgeWeights, Mask, Topology};
use agentgraph::graph::unit::{Agent, Unit};
use agentgraph::graph::Graph;

use crate::fake_agent::PeerCollector;

/// Builder for `Topology` with explicit edges.
pub struct TopologyBuilder {
    n: usize,
    spatial: Mask,
    temporal: Mask,
    weights: Option<EdgeWeights>,
}

impl TopologyBuilder {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            spatial: Mask::zeros(n),
            temporal: Mask::zeros(n),
            weights: None,
        }
    }

    /// Unit `from` precedes unit `to` within a round.
    pub fn spatial(mut self, from: usize, to: usize) -> Self {
        self.spatial.set(from, to, true);
        self
    }

    /// Unit `to` sees unit `from`'s previous-round output.
    pub fn temporal(mut self, from: usize, to: usize) -> Self {
        self.temporal.set(from, to, true);
        self
    }

    /// Every temporal entry set, diagonal included.
    pub fn temporal_all(mut self) -> Self {
        self.temporal = Mask::ones(self.n);
        self
    }

    /// Chain `0 -> 1 -> ... -> n-1`.
    pub fn chain(mut self) -> Self {
        for i in 1..self.n {
            self.spatial.set(i - 1, i, true);
        }
        self
    }

    pub fn weights(mut self, weights: EdgeWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn build(self) -> Topology {
        let topology = Topology::new(self.spatial, self.temporal);
        match self.weights {
            Some(w) => topology.with_weights(w),
            None => topology,
        }
    }
}

/// Builder for `Graph` from fake agents.
///
/// Units get ids `u0`, `u1`, ... in insertion order; the decision unit
/// defaults to a [`PeerCollector`].
pub struct GraphBuilder {
    units: Vec<Unit>,
    decision: Option<Unit>,
    topology: Option<Topology>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            decision: None,
            topology: None,
        }
    }

    pub fn unit(mut self, agent: impl Agent + 'static) -> Self {
        let id = format!("u{}", self.units.len());
        self.units
            .push(Unit::new(Some(id), "scripted", "Scripted", Box::new(agent)));
        self
    }

    pub fn decision(mut self, agent: impl Agent + 'static) -> Self {
        self.decision = Some(Unit::new(
            Some("decision".to_string()),
            "decision",
            "Decision",
            Box::new(agent),
        ));
        self
    }

    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    pub fn build(self) -> Graph {
        let n = self.units.len();
        let topology = self
            .topology
            .unwrap_or_else(|| TopologyBuilder::new(n).build());
        let decision = self.decision.unwrap_or_else(|| {
            Unit::new(
                Some("decision".to_string()),
                "decision",
                "Decision",
                Box::new(PeerCollector::new()),
            )
        });
        Graph::new(self.units, decision, topology).expect("Failed to build graph from builder")
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
