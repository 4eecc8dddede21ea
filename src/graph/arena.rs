// src/graph/arena.rs

//! Unit storage and the edge model.
//!
//! Units live in insertion order inside a `Vec`, with a side index from id
//! to position. Edges are id pairs recorded on both endpoints' connection
//! lists, for each [`EdgeKind`] independently.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::graph::unit::{
    Connections, DependencyInfo, NeighbourInfo, PeerOutput, Unit, UnitId, generate_unit_id,
};
use crate::types::EdgeKind;

/// Why an edge was not added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRejection {
    SelfLoop,
    UnknownUnit,
    Duplicate,
    WouldCycle,
}

/// Arena of units indexed by id.
#[derive(Debug, Default)]
pub struct UnitArena {
    units: Vec<Unit>,
    index: HashMap<UnitId, usize>,
}

impl UnitArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit, regenerating its id until it is unique.
    ///
    /// Returns the id the unit ended up with.
    pub fn insert(&mut self, mut unit: Unit) -> UnitId {
        while self.index.contains_key(unit.id()) {
            let fresh = generate_unit_id();
            debug!(old = %unit.id(), new = %fresh, "unit id already taken; regenerating");
            unit.set_id(fresh);
        }
        let id = unit.id().to_string();
        self.index.insert(id.clone(), self.units.len());
        self.units.push(unit);
        id
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Unit> {
        let position = self.position(id)?;
        self.units.get(position)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Unit> {
        let position = self.position(id)?;
        self.units.get_mut(position)
    }

    /// Units in creation order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub(crate) fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.iter_mut()
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|u| u.id().to_string()).collect()
    }

    /// Whether `target` can be reached from `from` following `kind`
    /// successor links. A unit always reaches itself.
    pub fn reachable(&self, from: &str, target: &str, kind: EdgeKind) -> bool {
        let mut stack: Vec<&str> = vec![from];
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(unit) = self.get(id) {
                stack.extend(unit.connections().successors(kind).iter().map(String::as_str));
            }
        }

        false
    }

    /// Add `from -> to` for `kind`, unless it is a self-loop, a duplicate or
    /// touches an unknown unit. Spatial edges are also refused when they would
    /// close a cycle among spatial edges.
    ///
    /// Temporal edges only read last round's snapshots and never order
    /// execution, so mutual temporal pairs are allowed.
    ///
    /// Nothing is mutated when the edge is rejected.
    pub fn add_edge(&mut self, from: &str, to: &str, kind: EdgeKind) -> Result<(), EdgeRejection> {
        if from == to {
            return Err(EdgeRejection::SelfLoop);
        }
        let (Some(from_pos), Some(to_pos)) = (self.position(from), self.position(to)) else {
            return Err(EdgeRejection::UnknownUnit);
        };
        if self.units[from_pos]
            .connections()
            .successors(kind)
            .iter()
            .any(|s| s == to)
        {
            return Err(EdgeRejection::Duplicate);
        }
        if kind == EdgeKind::Spatial && self.reachable(to, from, kind) {
            return Err(EdgeRejection::WouldCycle);
        }

        self.units[from_pos]
            .connections_mut()
            .successors_mut(kind)
            .push(to.to_string());
        self.units[to_pos]
            .connections_mut()
            .predecessors_mut(kind)
            .push(from.to_string());

        trace!(%from, %to, %kind, "edge added");
        Ok(())
    }

    /// Drop every edge of `kind`, including links to units outside the
    /// arena (such as the decision unit).
    pub fn clear_edges(&mut self, kind: EdgeKind) {
        for unit in &mut self.units {
            unit.connections_mut().clear(kind);
        }
    }

    /// Register an external unit (not stored here) as a spatial successor of
    /// `from`. The in-degree propagation of the scheduler skips such ids.
    pub fn link_external_successor(&mut self, from: &str, external: &str) -> bool {
        let Some(unit) = self.get_mut(from) else {
            return false;
        };
        let successors = unit.connections_mut().successors_mut(EdgeKind::Spatial);
        if successors.iter().any(|s| s == external) {
            return false;
        }
        successors.push(external.to_string());
        true
    }

    /// All `(from, to)` pairs of `kind`, ordered by source creation order.
    pub fn edges(&self, kind: EdgeKind) -> Vec<(UnitId, UnitId)> {
        self.units
            .iter()
            .flat_map(|u| {
                u.connections()
                    .successors(kind)
                    .iter()
                    .filter(|s| self.contains(s))
                    .map(move |s| (u.id().to_string(), s.clone()))
            })
            .collect()
    }

    /// Read predecessor outputs for a reader with the given connections.
    ///
    /// Spatial predecessors contribute their *live* last output; temporal
    /// predecessors contribute the last output of their memory snapshot.
    /// Predecessors without output, or missing from the arena, are skipped.
    pub fn collect_dependency_info(&self, connections: &Connections) -> NeighbourInfo {
        let mut spatial = DependencyInfo::new();
        for id in &connections.spatial_predecessors {
            if let Some(unit) = self.get(id) {
                if let Some(output) = unit.outputs().last() {
                    spatial.push(PeerOutput {
                        unit_id: id.clone(),
                        role: unit.role().to_string(),
                        output: output.clone(),
                    });
                }
            }
        }

        let mut temporal = DependencyInfo::new();
        for id in &connections.temporal_predecessors {
            if let Some(unit) = self.get(id) {
                if let Some(output) = unit.last_memory().outputs.last() {
                    temporal.push(PeerOutput {
                        unit_id: id.clone(),
                        role: unit.role().to_string(),
                        output: output.clone(),
                    });
                }
            }
        }

        NeighbourInfo { spatial, temporal }
    }

    /// Snapshot every unit's round state into its `last_memory`.
    pub fn snapshot_memory(&mut self) {
        for unit in &mut self.units {
            unit.snapshot_memory();
        }
    }
}
