// src/agents/analyze.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::agents::registry::{AgentRegistry, Spawned};
use crate::graph::unit::{Agent, AgentOutput, ExecutionContext, NeighbourInfo};
use crate::llm::{ChatMessage, LanguageModel};
use crate::prompt;

pub const NAME: &str = "AnalyzeAgent";

/// Works one story role over the task and what the other agents produced
/// this round.
///
/// The system prompt is the role's job description, falling back to the
/// generic answer constraint for unknown roles. The `Fake` role is asked to
/// mislead instead.
pub struct AnalyzeAgent {
    role: String,
    llm: Arc<dyn LanguageModel>,
}

impl AnalyzeAgent {
    pub fn new(role: impl Into<String>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            role: role.into(),
            llm,
        }
    }

    fn constraint(&self) -> &'static str {
        prompt::story_role_description(&self.role).unwrap_or(prompt::ANSWER_CONSTRAINT)
    }

    fn messages(ctx: &ExecutionContext<'_>) -> Result<Vec<ChatMessage>> {
        ctx.inputs
            .iter()
            .map(|v| serde_json::from_value(v.clone()))
            .collect::<std::result::Result<Vec<ChatMessage>, _>>()
            .context("AnalyzeAgent inputs are not chat messages")
    }
}

impl Agent for AnalyzeAgent {
    fn process_inputs(&self, raw_input: &Value, neighbours: &NeighbourInfo) -> Result<Vec<Value>> {
        let task = prompt::task_text(raw_input);
        let mut user = if self.role == prompt::FAKE_ROLE {
            prompt::adversarial_prompt(&task)
        } else {
            format!("The task is :{task}\n")
        };

        let peers = prompt::describe_peers(&neighbours.spatial);
        if !peers.is_empty() {
            user.push_str(&format!(
                "At the same time, the outputs of other agents are as follows:\n\n{peers} \n\n"
            ));
        }

        [ChatMessage::system(self.constraint()), ChatMessage::user(user)]
            .into_iter()
            .map(|m| serde_json::to_value(m).context("serialize chat message"))
            .collect()
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
        let messages = Self::messages(ctx)?;
        let reply = self.llm.generate(&messages)?;
        debug!(unit = %ctx.unit_id, role = %self.role, "AnalyzeAgent replied");
        Ok(AgentOutput::text(reply))
    }

    fn execute_async<'a>(&'a self, ctx: &'a ExecutionContext<'a>) -> BoxFuture<'a, Result<AgentOutput>> {
        Box::pin(async move {
            let messages = Self::messages(ctx)?;
            let reply = self.llm.generate_async(&messages).await?;
            debug!(unit = %ctx.unit_id, role = %self.role, "AnalyzeAgent replied");
            Ok(AgentOutput::text(reply))
        })
    }
}

pub fn register(registry: &mut AgentRegistry) {
    registry.register(NAME, |args| {
        let role = args.role_or(prompt::story_role_for_index(args.index));
        let llm = args.require_llm(NAME)?;
        Ok(Spawned {
            agent: Box::new(AnalyzeAgent::new(role.clone(), llm)),
            role,
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::registry::AgentArgs;
    use crate::graph::unit::{DependencyInfo, PeerOutput};
    use crate::llm::MockModel;
    use serde_json::json;

    fn neighbours() -> NeighbourInfo {
        let mut spatial = DependencyInfo::new();
        spatial.push(PeerOutput {
            unit_id: "plan".into(),
            role: "Planner".into(),
            output: json!("A lighthouse keeper finds a map."),
        });
        let mut temporal = DependencyInfo::new();
        temporal.push(PeerOutput {
            unit_id: "old".into(),
            role: "Critic".into(),
            output: json!("too slow"),
        });
        NeighbourInfo { spatial, temporal }
    }

    #[test]
    fn prompt_uses_role_description_and_spatial_peers_only() {
        let agent = AnalyzeAgent::new("Polisher", Arc::new(MockModel::default()));

        let inputs = agent
            .process_inputs(&json!({"task": "a sea story"}), &neighbours())
            .unwrap();

        assert!(inputs[0]["content"].as_str().unwrap().starts_with("You are the Polisher"));
        let user = inputs[1]["content"].as_str().unwrap();
        assert!(user.starts_with("The task is :a sea story"));
        assert!(user.contains("At the same time, the outputs of other agents are as follows"));
        assert!(user.contains("Agent plan, role is Planner"));
        assert!(!user.contains("too slow"));
    }

    #[test]
    fn fake_role_is_asked_to_mislead() {
        let agent = AnalyzeAgent::new(prompt::FAKE_ROLE, Arc::new(MockModel::default()));

        let inputs = agent
            .process_inputs(&json!({"task": "2+2"}), &NeighbourInfo::default())
            .unwrap();

        assert_eq!(inputs[0]["content"], prompt::ANSWER_CONSTRAINT);
        let user = inputs[1]["content"].as_str().unwrap();
        assert!(user.starts_with("Give a wrong answer"));
        assert!(!user.contains("At the same time"));
    }

    #[test]
    fn roles_follow_the_story_cycle() {
        let mut registry = AgentRegistry::new();
        register(&mut registry);
        let llm: Arc<dyn LanguageModel> = Arc::new(MockModel::default());

        let unit = registry
            .resolve(NAME, &AgentArgs::new(1).with_llm(llm.clone()))
            .unwrap();
        assert_eq!(unit.role(), "Copywriter");

        let unit = registry
            .resolve(NAME, &AgentArgs::new(1).with_llm(llm).with_role("Critic"))
            .unwrap();
        assert_eq!(unit.role(), "Critic");

        assert!(registry.resolve(NAME, &AgentArgs::new(0)).is_err());
    }

    #[test]
    fn executes_through_the_model() {
        let model = Arc::new(MockModel::with_reply("Chapter one."));
        let mut registry = AgentRegistry::new();
        register(&mut registry);
        let mut unit = registry
            .resolve(NAME, &AgentArgs::new(0).with_llm(model.clone()))
            .unwrap();

        let outputs = unit.execute(&json!({"task": "t"}), &neighbours()).unwrap();

        assert_eq!(outputs, &[json!("Chapter one.")]);
        assert_eq!(model.calls(), 1);
    }
}
