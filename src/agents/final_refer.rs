// src/agents/final_refer.rs

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::agents::registry::{AgentRegistry, Spawned};
use crate::answer::extract_answer;
use crate::graph::NO_ANSWER;
use crate::graph::unit::{Agent, AgentOutput, ExecutionContext, NeighbourInfo};
use crate::prompt;

pub const NAME: &str = "FinalRefer";
pub const ROLE: &str = "Final Decision Maker";

/// Every spatial peer output, flattening array outputs.
pub(crate) fn peer_outputs(neighbours: &NeighbourInfo) -> Vec<Value> {
    let mut out = Vec::new();
    for peer in neighbours.spatial.iter() {
        match peer.output {
            Value::Array(ref items) => out.extend(items.iter().cloned()),
            ref other => out.push(other.clone()),
        }
    }
    out
}

/// Pick the first output that carries an extractable answer.
///
/// No peers yields an empty batch; peers without answers yield [`NO_ANSWER`].
pub(crate) fn refer(outputs: &[Value]) -> AgentOutput {
    if outputs.is_empty() {
        return AgentOutput::empty();
    }
    outputs
        .iter()
        .find(|o| extract_answer(&prompt::value_text(o)).is_some())
        .map(|o| AgentOutput::Single(o.clone()))
        .unwrap_or_else(|| AgentOutput::text(NO_ANSWER))
}

/// Decision agent returning the first peer output with an answer in it.
#[derive(Debug, Default)]
pub struct FinalRefer;

impl Agent for FinalRefer {
    fn process_inputs(&self, raw_input: &Value, _neighbours: &NeighbourInfo) -> Result<Vec<Value>> {
        Ok(vec![raw_input.clone()])
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
        Ok(refer(&peer_outputs(ctx.neighbours)))
    }

    fn execute_async<'a>(&'a self, ctx: &'a ExecutionContext<'a>) -> BoxFuture<'a, Result<AgentOutput>> {
        Box::pin(async move { self.execute(ctx) })
    }
}

pub fn register(registry: &mut AgentRegistry) {
    registry.register(NAME, |args| {
        Ok(Spawned {
            role: args.role_or(ROLE),
            agent: Box::new(FinalRefer),
        })
    });
}
