// src/agents/normal.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::agents::registry::{AgentRegistry, Spawned};
use crate::graph::unit::{Agent, AgentOutput, ExecutionContext, NeighbourInfo};
use crate::llm::{ChatMessage, LanguageModel};
use crate::prompt;

pub const NAME: &str = "normalAgent";

/// Asks the language model, showing it what peers said this round and last
/// round.
pub struct NormalAgent {
    role: String,
    llm: Arc<dyn LanguageModel>,
}

impl NormalAgent {
    pub fn new(role: impl Into<String>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            role: role.into(),
            llm,
        }
    }

    fn messages(ctx: &ExecutionContext<'_>) -> Result<Vec<ChatMessage>> {
        ctx.inputs
            .iter()
            .map(|v| serde_json::from_value(v.clone()))
            .collect::<std::result::Result<Vec<ChatMessage>, _>>()
            .context("normalAgent inputs are not chat messages")
    }
}

impl Agent for NormalAgent {
    fn process_inputs(&self, raw_input: &Value, neighbours: &NeighbourInfo) -> Result<Vec<Value>> {
        let system = format!(
            "{}{}",
            prompt::role_description(&self.role),
            prompt::ANSWER_CONSTRAINT
        );

        let mut user = format!("The task is: {}", prompt::task_text(raw_input));
        let spatial = prompt::describe_peers(&neighbours.spatial);
        if !spatial.is_empty() {
            user.push_str(&format!(
                "At the same time, the outputs of other agents are as follows:\n\n{spatial} \n\n"
            ));
        }
        let temporal = prompt::describe_peers(&neighbours.temporal);
        if !temporal.is_empty() {
            user.push_str(&format!(
                "In the last round of dialogue, the outputs of other agents were: \n\n{temporal}"
            ));
        }

        [ChatMessage::system(system), ChatMessage::user(user)]
            .into_iter()
            .map(|m| serde_json::to_value(m).context("serialize chat message"))
            .collect()
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
        let messages = Self::messages(ctx)?;
        let reply = self.llm.generate(&messages)?;
        debug!(unit = %ctx.unit_id, role = %self.role, "normalAgent replied");
        Ok(AgentOutput::text(reply))
    }

    fn execute_async<'a>(&'a self, ctx: &'a ExecutionContext<'a>) -> BoxFuture<'a, Result<AgentOutput>> {
        Box::pin(async move {
            let messages = Self::messages(ctx)?;
            let reply = self.llm.generate_async(&messages).await?;
            debug!(unit = %ctx.unit_id, role = %self.role, "normalAgent replied");
            Ok(AgentOutput::text(reply))
        })
    }
}

pub fn register(registry: &mut AgentRegistry) {
    registry.register(NAME, |args| {
        let role = args.role_or(prompt::role_for_index(args.index));
        let llm = args.require_llm(NAME)?;
        Ok(Spawned {
            agent: Box::new(NormalAgent::new(role.clone(), llm)),
            role,
        })
    });
}
