// src/agents/math_solver.rs

use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::{Value, json};

use crate::agents::registry::{AgentRegistry, Spawned};
use crate::graph::unit::{Agent, AgentOutput, ExecutionContext, NeighbourInfo};
use crate::llm::{ChatMessage, LanguageModel};
use crate::prompt;

pub const NAME: &str = "MathSolver";
pub const ROLE: &str = "Math Solver";

/// Step-by-step math prompt. Works offline with a placeholder answer when no
/// model is configured.
pub struct MathSolver {
    llm: Option<Arc<dyn LanguageModel>>,
}

impl MathSolver {
    pub fn new(llm: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { llm }
    }

    fn problem(ctx: &ExecutionContext<'_>) -> String {
        match ctx.inputs.first() {
            Some(input) => prompt::task_text(input),
            None => prompt::task_text(ctx.raw_input),
        }
    }

    fn placeholder(problem: &str) -> AgentOutput {
        AgentOutput::text(format!(
            "Processing math problem: {problem}\nThis is a placeholder solution."
        ))
    }

    fn prompt(problem: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(format!(
            "Please solve this math problem step by step: {problem}"
        ))]
    }
}

impl Agent for MathSolver {
    /// Objects pass through; anything else is wrapped as `{"task": ...}`.
    fn process_inputs(&self, raw_input: &Value, _neighbours: &NeighbourInfo) -> Result<Vec<Value>> {
        let input = match raw_input {
            Value::Object(_) => raw_input.clone(),
            other => json!({ "task": prompt::value_text(other) }),
        };
        Ok(vec![input])
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
        let problem = Self::problem(ctx);
        match self.llm {
            Some(ref llm) => Ok(AgentOutput::text(llm.generate(&Self::prompt(&problem))?)),
            None => Ok(Self::placeholder(&problem)),
        }
    }

    fn execute_async<'a>(&'a self, ctx: &'a ExecutionContext<'a>) -> BoxFuture<'a, Result<AgentOutput>> {
        Box::pin(async move {
            let problem = Self::problem(ctx);
            match self.llm {
                Some(ref llm) => {
                    let messages = Self::prompt(&problem);
                    Ok(AgentOutput::text(llm.generate_async(&messages).await?))
                }
                None => Ok(Self::placeholder(&problem)),
            }
        })
    }
}

pub fn register(registry: &mut AgentRegistry) {
    registry.register(NAME, |args| {
        Ok(Spawned {
            role: args.role_or(ROLE),
            agent: Box::new(MathSolver::new(args.llm.clone())),
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_plain_inputs_and_falls_back_to_placeholder() {
        let solver = MathSolver::new(None);
        let raw = json!("1+1");
        let neighbours = NeighbourInfo::default();
        let inputs = solver.process_inputs(&raw, &neighbours).unwrap();
        assert_eq!(inputs, vec![json!({"task": "1+1"})]);

        let ctx = ExecutionContext {
            unit_id: "m",
            role: ROLE,
            raw_input: &raw,
            inputs: &inputs,
            neighbours: &neighbours,
        };
        let out = solver.execute(&ctx).unwrap().into_values();
        assert!(out[0].as_str().unwrap().contains("placeholder solution"));
    }
}
