// src/agents/majority_vote.rs

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::agents::final_refer::{peer_outputs, refer};
use crate::agents::registry::{AgentRegistry, Spawned};
use crate::answer::extract_answer;
use crate::graph::unit::{Agent, AgentOutput, ExecutionContext, NeighbourInfo};
use crate::prompt;

pub const NAME: &str = "FinalMajorityVote";
pub const ROLE: &str = "Final Majority Voter";

/// Most frequent extracted answer; ties go to the answer seen first.
fn vote(outputs: &[Value]) -> Option<String> {
    let mut tally: Vec<(String, usize)> = Vec::new();
    for answer in outputs
        .iter()
        .filter_map(|o| extract_answer(&prompt::value_text(o)))
    {
        match tally.iter_mut().find(|(a, _)| *a == answer) {
            Some((_, count)) => *count += 1,
            None => tally.push((answer, 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (answer, count) in tally {
        if best.as_ref().is_none_or(|(_, c)| count > *c) {
            best = Some((answer, count));
        }
    }
    best.map(|(answer, _)| answer)
}

/// Decision agent voting over the answers of its peers.
#[derive(Debug, Default)]
pub struct FinalMajorityVote;

impl Agent for FinalMajorityVote {
    fn process_inputs(&self, raw_input: &Value, _neighbours: &NeighbourInfo) -> Result<Vec<Value>> {
        Ok(vec![raw_input.clone()])
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
        let outputs = peer_outputs(ctx.neighbours);
        Ok(match vote(&outputs) {
            Some(answer) => AgentOutput::text(answer),
            None => refer(&outputs),
        })
    }

    fn execute_async<'a>(&'a self, ctx: &'a ExecutionContext<'a>) -> BoxFuture<'a, Result<AgentOutput>> {
        Box::pin(async move { self.execute(ctx) })
    }
}

pub fn register(registry: &mut AgentRegistry) {
    registry.register(NAME, |args| {
        Ok(Spawned {
            role: args.role_or(ROLE),
            agent: Box::new(FinalMajorityVote),
        })
    });
}
