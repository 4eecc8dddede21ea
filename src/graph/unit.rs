// src/graph/unit.rs

//! The unit wrapper around a single agent.
//!
//! A [`Unit`] owns identity, a role label, its four connection lists and its
//! per-round state (`inputs`, `outputs`, `raw_inputs`, `last_memory`). The
//! actual computation is delegated to a boxed [`Agent`].
//!
//! Connections store unit *ids*, never references; lookups go through the
//! [`UnitArena`](crate::graph::arena::UnitArena).

use anyhow::Result;
use futures::future::BoxFuture;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;

use crate::types::EdgeKind;

/// Opaque unit identifier, unique within one graph instance.
pub type UnitId = String;

/// Length of generated unit ids.
const GENERATED_ID_LEN: usize = 4;

/// Generate a short random id.
pub fn generate_unit_id() -> UnitId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ID_LEN)
        .map(char::from)
        .collect()
}

/// What an agent produced for one execution.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    Single(Value),
    Batch(Vec<Value>),
}

impl AgentOutput {
    /// Normalise into an output sequence.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            AgentOutput::Single(v) => vec![v],
            AgentOutput::Batch(vs) => vs,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        AgentOutput::Single(Value::String(s.into()))
    }

    pub fn empty() -> Self {
        AgentOutput::Batch(Vec::new())
    }
}

/// The latest output of one predecessor, as seen by a successor.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerOutput {
    pub unit_id: UnitId,
    pub role: String,
    pub output: Value,
}

/// Ordered map of predecessor id to its latest output.
///
/// Order follows the predecessor list of the reading unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyInfo {
    entries: Vec<PeerOutput>,
}

impl DependencyInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PeerOutput) {
        self.entries.push(entry);
    }

    pub fn get(&self, unit_id: &str) -> Option<&PeerOutput> {
        self.entries.iter().find(|e| e.unit_id == unit_id)
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.get(unit_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerOutput> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dependency info for both edge kinds.
///
/// `spatial` is what happened earlier this round; `temporal` is what
/// happened in the previous round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighbourInfo {
    pub spatial: DependencyInfo,
    pub temporal: DependencyInfo,
}

/// Snapshot of a unit's state at the end of a round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memory {
    pub inputs: Vec<Value>,
    pub outputs: Vec<Value>,
    pub raw_inputs: Vec<Value>,
}

/// Ordered id lists for both edge kinds, in both directions.
#[derive(Debug, Clone, Default)]
pub struct Connections {
    pub spatial_predecessors: Vec<UnitId>,
    pub spatial_successors: Vec<UnitId>,
    pub temporal_predecessors: Vec<UnitId>,
    pub temporal_successors: Vec<UnitId>,
}

impl Connections {
    pub fn predecessors(&self, kind: EdgeKind) -> &[UnitId] {
        match kind {
            EdgeKind::Spatial => &self.spatial_predecessors,
            EdgeKind::Temporal => &self.temporal_predecessors,
        }
    }

    pub fn successors(&self, kind: EdgeKind) -> &[UnitId] {
        match kind {
            EdgeKind::Spatial => &self.spatial_successors,
            EdgeKind::Temporal => &self.temporal_successors,
        }
    }

    pub(crate) fn predecessors_mut(&mut self, kind: EdgeKind) -> &mut Vec<UnitId> {
        match kind {
            EdgeKind::Spatial => &mut self.spatial_predecessors,
            EdgeKind::Temporal => &mut self.temporal_predecessors,
        }
    }

    pub(crate) fn successors_mut(&mut self, kind: EdgeKind) -> &mut Vec<UnitId> {
        match kind {
            EdgeKind::Spatial => &mut self.spatial_successors,
            EdgeKind::Temporal => &mut self.temporal_successors,
        }
    }

    /// Drop every edge of `kind`.
    pub fn clear(&mut self, kind: EdgeKind) {
        self.predecessors_mut(kind).clear();
        self.successors_mut(kind).clear();
    }

    pub fn clear_all(&mut self) {
        self.clear(EdgeKind::Spatial);
        self.clear(EdgeKind::Temporal);
    }
}

/// Everything an agent may look at while computing its result.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    /// Id of the executing unit.
    pub unit_id: &'a str,
    /// Role label of the executing unit.
    pub role: &'a str,
    /// The external run input, untouched.
    pub raw_input: &'a Value,
    /// Output of [`Agent::process_inputs`] for this execution.
    pub inputs: &'a [Value],
    pub neighbours: &'a NeighbourInfo,
}

/// The computation behind a unit.
///
/// Implementations must not keep per-execution state that would make
/// concurrent calls on *different* units interfere; each unit holds its own
/// agent instance.
pub trait Agent: Send + Sync {
    /// Turn the raw run input plus neighbour info into the values stored as
    /// the unit's `inputs`.
    fn process_inputs(&self, raw_input: &Value, neighbours: &NeighbourInfo) -> Result<Vec<Value>>;

    /// Blocking computation.
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput>;

    /// Non-blocking computation. The only suspension point of a round.
    fn execute_async<'a>(&'a self, ctx: &'a ExecutionContext<'a>) -> BoxFuture<'a, Result<AgentOutput>>;
}

/// Atomic executable node of the graph.
pub struct Unit {
    id: UnitId,
    agent_name: String,
    role: String,
    agent: Box<dyn Agent>,
    connections: Connections,
    inputs: Vec<Value>,
    outputs: Vec<Value>,
    raw_inputs: Vec<Value>,
    last_memory: Memory,
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("agent_name", &self.agent_name)
            .field("role", &self.role)
            .field("connections", &self.connections)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl Unit {
    /// Wrap an agent. A missing id is generated.
    pub fn new(
        id: Option<UnitId>,
        agent_name: impl Into<String>,
        role: impl Into<String>,
        agent: Box<dyn Agent>,
    ) -> Self {
        Self {
            id: id.unwrap_or_else(generate_unit_id),
            agent_name: agent_name.into(),
            role: role.into(),
            agent,
            connections: Connections::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            raw_inputs: Vec::new(),
            last_memory: Memory::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: UnitId) {
        self.id = id;
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    pub(crate) fn connections_mut(&mut self) -> &mut Connections {
        &mut self.connections
    }

    pub fn inputs(&self) -> &[Value] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Value] {
        &self.outputs
    }

    pub fn raw_inputs(&self) -> &[Value] {
        &self.raw_inputs
    }

    pub fn last_memory(&self) -> &Memory {
        &self.last_memory
    }

    /// Latest live output, if this round produced any.
    pub fn last_output(&self) -> Option<&Value> {
        self.outputs.last()
    }

    /// Replace the outputs after the scheduler gave up on this unit.
    pub(crate) fn mark_failed(&mut self, message: String) {
        self.outputs = vec![serde_json::json!({ "error": message })];
    }

    fn begin(&mut self, input: &Value, neighbours: &NeighbourInfo) -> Result<()> {
        self.outputs.clear();
        self.raw_inputs = vec![input.clone()];
        self.inputs = self.agent.process_inputs(input, neighbours)?;
        Ok(())
    }

    /// Run the agent synchronously and store its normalised result.
    ///
    /// `outputs` is cleared first; on error it stays empty.
    pub fn execute(&mut self, input: &Value, neighbours: &NeighbourInfo) -> Result<&[Value]> {
        self.begin(input, neighbours)?;
        let ctx = ExecutionContext {
            unit_id: &self.id,
            role: &self.role,
            raw_input: input,
            inputs: &self.inputs,
            neighbours,
        };
        let result = self.agent.execute(&ctx)?;
        self.outputs.extend(result.into_values());
        Ok(&self.outputs)
    }

    /// Non-blocking variant of [`Unit::execute`].
    ///
    /// Takes `&mut self`, so one unit can never run twice at once.
    pub async fn execute_async(
        &mut self,
        input: &Value,
        neighbours: &NeighbourInfo,
    ) -> Result<&[Value]> {
        self.begin(input, neighbours)?;
        let result = {
            let ctx = ExecutionContext {
                unit_id: &self.id,
                role: &self.role,
                raw_input: input,
                inputs: &self.inputs,
                neighbours,
            };
            self.agent.execute_async(&ctx).await?
        };
        self.outputs.extend(result.into_values());
        Ok(&self.outputs)
    }

    /// Copy the current round's state into `last_memory`.
    pub fn snapshot_memory(&mut self) {
        self.last_memory = Memory {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            raw_inputs: self.raw_inputs.clone(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use serde_json::json;

    /// Echoes the number of spatial peers it saw.
    struct CountingAgent;

    impl Agent for CountingAgent {
        fn process_inputs(&self, raw_input: &Value, _: &NeighbourInfo) -> Result<Vec<Value>> {
            Ok(vec![raw_input.clone()])
        }

        fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
            Ok(AgentOutput::Batch(vec![
                json!(ctx.neighbours.spatial.len()),
                json!(ctx.role),
            ]))
        }

        fn execute_async<'a>(
            &'a self,
            ctx: &'a ExecutionContext<'a>,
        ) -> BoxFuture<'a, Result<AgentOutput>> {
            Box::pin(async move { self.execute(ctx) })
        }
    }

    struct FailingAgent;

    impl Agent for FailingAgent {
        fn process_inputs(&self, _: &Value, _: &NeighbourInfo) -> Result<Vec<Value>> {
            Ok(vec![])
        }

        fn execute(&self, _: &ExecutionContext<'_>) -> Result<AgentOutput> {
            bail!("boom")
        }

        fn execute_async<'a>(
            &'a self,
            ctx: &'a ExecutionContext<'a>,
        ) -> BoxFuture<'a, Result<AgentOutput>> {
            Box::pin(async move { self.execute(ctx) })
        }
    }

    #[test]
    fn generated_ids_have_fixed_length() {
        let unit = Unit::new(None, "counting", "Counter", Box::new(CountingAgent));
        assert_eq!(unit.id().len(), GENERATED_ID_LEN);
        assert!(unit.id().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn execute_normalises_batch_and_records_inputs() {
        let mut unit = Unit::new(Some("u1".into()), "counting", "Counter", Box::new(CountingAgent));
        let input = json!({"task": "t"});

        let outputs = unit.execute(&input, &NeighbourInfo::default()).unwrap().to_vec();

        assert_eq!(outputs, vec![json!(0), json!("Counter")]);
        assert_eq!(unit.raw_inputs(), &[input.clone()]);
        assert_eq!(unit.inputs(), &[input]);
    }

    #[test]
    fn execute_clears_previous_outputs_even_on_failure() {
        let mut unit = Unit::new(Some("u1".into()), "failing", "F", Box::new(FailingAgent));
        unit.outputs = vec![json!("stale")];

        assert!(unit.execute(&json!(null), &NeighbourInfo::default()).is_err());
        assert!(unit.outputs().is_empty());
    }

    #[test]
    fn snapshot_copies_current_round_state() {
        let mut unit = Unit::new(Some("u1".into()), "counting", "Counter", Box::new(CountingAgent));
        unit.execute(&json!("x"), &NeighbourInfo::default()).unwrap();
        unit.snapshot_memory();

        assert_eq!(unit.last_memory().outputs, unit.outputs());
        assert_eq!(unit.last_memory().raw_inputs, vec![json!("x")]);

        unit.execute(&json!("y"), &NeighbourInfo::default()).unwrap();
        assert_eq!(unit.last_memory().raw_inputs, vec![json!("x")]);
    }

    #[tokio::test]
    async fn async_execute_matches_sync_contract() {
        let mut unit = Unit::new(Some("u1".into()), "counting", "Counter", Box::new(CountingAgent));
        let outputs = unit
            .execute_async(&json!("x"), &NeighbourInfo::default())
            .await
            .unwrap()
            .to_vec();
        assert_eq!(outputs.len(), 2);
        assert_eq!(unit.last_output(), Some(&json!("Counter")));
    }

    #[test]
    fn dependency_info_preserves_insertion_order() {
        let mut info = DependencyInfo::new();
        for id in ["b", "a", "c"] {
            info.push(PeerOutput {
                unit_id: id.into(),
                role: "r".into(),
                output: json!(id),
            });
        }
        let ids: Vec<_> = info.iter().map(|p| p.unit_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(info.contains("a"));
        assert!(!info.contains("z"));
    }
}
