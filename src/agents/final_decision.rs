// src/agents/final_decision.rs

use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::agents::registry::{AgentRegistry, Spawned};
use crate::graph::unit::{Agent, AgentOutput, ExecutionContext, NeighbourInfo};
use crate::llm::{ChatMessage, LanguageModel};
use crate::prompt;

pub const NAME: &str = "FinalDecision";
pub const ROLE: &str = "Story Integrator";

const SYSTEM_PROMPT: &str = "You are a master storyteller tasked with weaving story fragments \
into a single, coherent narrative.";

/// Task fields listed as requirements, in prompt order.
const REQUIREMENT_KEYS: [&str; 5] = ["theme", "genre", "setting", "tone", "length"];

/// Fragments shorter than this are left out of the stitched fallback.
const MIN_FRAGMENT_LEN: usize = 100;

/// A draft this long counts as a complete story.
const COMPLETE_STORY_LEN: usize = 500;

/// One non-empty peer output.
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    role: String,
    content: String,
}

impl Fragment {
    /// Higher wins when picking a finished draft. Critiques never win.
    fn priority(&self) -> Option<u8> {
        if self.role.contains("Critic") {
            None
        } else if self.role.contains("Polisher") {
            Some(3)
        } else if self.role.contains("Copywriter") {
            Some(2)
        } else {
            Some(1)
        }
    }
}

/// Spatial peer outputs as trimmed text. Array outputs contribute their
/// first element; empty outputs are dropped.
fn collect_fragments(neighbours: &NeighbourInfo) -> Vec<Fragment> {
    neighbours
        .spatial
        .iter()
        .filter_map(|peer| {
            let value = match peer.output {
                Value::Array(ref items) => items.first()?,
                ref other => other,
            };
            let content = prompt::value_text(value).trim().to_string();
            if value.is_null() || content.is_empty() {
                return None;
            }
            Some(Fragment {
                role: peer.role.clone(),
                content,
            })
        })
        .collect()
}

/// `input["task"]` as an object; a plain task becomes its `theme`.
fn task_info(input: &Value) -> Map<String, Value> {
    let task = match input {
        Value::Object(map) => map.get("task").cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };
    match task {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let theme = prompt::value_text(&other);
            let mut map = Map::new();
            if !theme.is_empty() {
                map.insert("theme".to_string(), Value::String(theme));
            }
            map
        }
    }
}

fn field<'a>(info: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    info.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn build_prompts(fragments: &[Fragment], info: &Map<String, Value>) -> Vec<ChatMessage> {
    let mut requirements: Vec<String> = REQUIREMENT_KEYS
        .iter()
        .filter_map(|key| {
            let value = field(info, key)?;
            let mut label = key.to_string();
            label[..1].make_ascii_uppercase();
            Some(format!("- {label}: {value}"))
        })
        .collect();
    if let Some(Value::Array(constraints)) = info.get("constraints") {
        if !constraints.is_empty() {
            requirements.push("- Constraints:".to_string());
            requirements.extend(
                constraints
                    .iter()
                    .map(|c| format!("  * {}", prompt::value_text(c))),
            );
        }
    }

    let fragment_text = fragments
        .iter()
        .enumerate()
        .map(|(i, f)| format!("--- Fragment {} ({}) ---\n{}", i + 1, f.role, f.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let user = format!(
        "Please integrate the following story fragments into a cohesive narrative:\n\n\
         {}\n\n{fragment_text}\n\n\
         Ensure a smooth flow and maintain the specified tone and genre.",
        requirements.join("\n")
    );
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Result when no peer produced anything.
fn default_story(info: &Map<String, Value>) -> String {
    let theme = field(info, "theme").unwrap_or("An Untold Story");
    format!("# {theme}\n\nNo fragments provided. A new story awaits your imagination.")
}

/// Offline integration: the highest-priority complete draft under a title,
/// else every substantial non-critique fragment stitched together.
fn simple_integration(fragments: &[Fragment], info: &Map<String, Value>) -> String {
    let theme = field(info, "theme").unwrap_or("A Tale of Adventure");

    let best = fragments
        .iter()
        .filter(|f| f.priority().is_some_and(|p| p >= 2))
        .filter(|f| f.content.len() > COMPLETE_STORY_LEN)
        .max_by_key(|f| f.priority());
    if let Some(draft) = best {
        let title = match field(info, "genre") {
            Some(genre) => format!("# A {genre} Tale: {theme}"),
            None => format!("# {theme}"),
        };
        return format!("{title}\n\n{}", draft.content);
    }

    let genre = field(info, "genre").unwrap_or("Fantasy");
    let mut parts = vec![format!("# A {genre} Tale: {theme}")];
    parts.extend(
        fragments
            .iter()
            .filter(|f| f.priority().is_some() && f.content.len() > MIN_FRAGMENT_LEN)
            .map(|f| f.content.clone()),
    );
    parts.push("*The End*".to_string());
    parts.join("\n\n")
}

/// Decision agent that asks the language model to merge every peer output
/// into one narrative.
///
/// Without peer output it returns a default story. Without a model, or when
/// the model call fails, it integrates the fragments itself.
pub struct FinalDecision {
    llm: Option<Arc<dyn LanguageModel>>,
}

impl FinalDecision {
    pub fn new(llm: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { llm }
    }

    fn finish(reply: Result<String>, fragments: &[Fragment], info: &Map<String, Value>) -> AgentOutput {
        match reply {
            Ok(text) => AgentOutput::text(text.trim()),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "FinalDecision model call failed; integrating locally");
                AgentOutput::text(simple_integration(fragments, info))
            }
        }
    }
}

impl Agent for FinalDecision {
    fn process_inputs(&self, raw_input: &Value, _neighbours: &NeighbourInfo) -> Result<Vec<Value>> {
        Ok(vec![raw_input.clone()])
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
        let info = task_info(ctx.raw_input);
        let fragments = collect_fragments(ctx.neighbours);
        if fragments.is_empty() {
            return Ok(AgentOutput::text(default_story(&info)));
        }
        debug!(fragments = fragments.len(), "integrating fragments");

        Ok(match self.llm {
            Some(ref llm) => {
                let reply = llm.generate(&build_prompts(&fragments, &info));
                Self::finish(reply, &fragments, &info)
            }
            None => AgentOutput::text(simple_integration(&fragments, &info)),
        })
    }

    fn execute_async<'a>(&'a self, ctx: &'a ExecutionContext<'a>) -> BoxFuture<'a, Result<AgentOutput>> {
        Box::pin(async move {
            let info = task_info(ctx.raw_input);
            let fragments = collect_fragments(ctx.neighbours);
            if fragments.is_empty() {
                return Ok(AgentOutput::text(default_story(&info)));
            }
            debug!(fragments = fragments.len(), "integrating fragments");

            Ok(match self.llm {
                Some(ref llm) => {
                    let messages = build_prompts(&fragments, &info);
                    let reply = llm.generate_async(&messages).await;
                    Self::finish(reply, &fragments, &info)
                }
                None => AgentOutput::text(simple_integration(&fragments, &info)),
            })
        })
    }
}

pub fn register(registry: &mut AgentRegistry) {
    registry.register(NAME, |args| {
        Ok(Spawned {
            role: args.role_or(ROLE),
            agent: Box::new(FinalDecision::new(args.llm.clone())),
        })
    });
}
