// src/graph/mod.rs

//! Agent graph construction and execution.
//!
//! - [`unit`] wraps one agent with identity, connections and round state.
//! - [`arena`] stores units by id and owns the cycle-checked edge model.
//! - [`topology`] describes which edges to build (masks, presets, weights).
//! - [`builder`] turns a topology into live edges each round.
//! - [`scheduler`] executes one round in spatial dependency order.
//! - [`graph`] ties rounds together and runs the decision unit.

pub mod arena;
pub mod builder;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod scheduler;
pub mod topology;
pub mod unit;

pub use arena::{EdgeRejection, UnitArena};
pub use builder::ConnectionBuilder;
pub use graph::{Graph, NO_ANSWER, RunOutcome};
pub use scheduler::{RoundExecutor, RoundReport};
pub use topology::{EdgeWeights, Mask, Topology, TopologyMode};
pub use unit::{
    Agent, AgentOutput, Connections, DependencyInfo, ExecutionContext, Memory, NeighbourInfo,
    PeerOutput, Unit, UnitId,
};
