// src/agents/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{GraphError, Result};
use crate::graph::unit::{Agent, Unit, UnitId};
use crate::llm::LanguageModel;

/// Construction arguments handed to every factory.
#[derive(Clone, Default)]
pub struct AgentArgs {
    /// Position of the agent in the graph; drives default role selection.
    pub index: usize,
    pub id: Option<UnitId>,
    /// Overrides the factory's default role.
    pub role: Option<String>,
    pub domain: String,
    pub llm: Option<Arc<dyn LanguageModel>>,
}

impl std::fmt::Debug for AgentArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentArgs")
            .field("index", &self.index)
            .field("id", &self.id)
            .field("role", &self.role)
            .field("domain", &self.domain)
            .field("llm", &self.llm.as_ref().map(|m| m.name().to_string()))
            .finish()
    }
}

impl AgentArgs {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<UnitId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Configured role, or `default` when none was given.
    pub fn role_or(&self, default: &str) -> String {
        self.role.clone().unwrap_or_else(|| default.to_string())
    }

    /// The language model, or a config error naming `agent`.
    pub fn require_llm(&self, agent: &str) -> Result<Arc<dyn LanguageModel>> {
        self.llm
            .clone()
            .ok_or_else(|| GraphError::Config(format!("agent {agent} requires a language model")))
    }
}

/// What a factory hands back: the agent and the role label it settled on.
pub struct Spawned {
    pub role: String,
    pub agent: Box<dyn Agent>,
}

pub type AgentFactory = Box<dyn Fn(&AgentArgs) -> Result<Spawned> + Send + Sync>;

/// Explicit name → factory table.
#[derive(Default)]
pub struct AgentRegistry {
    factories: BTreeMap<String, AgentFactory>,
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every agent this crate ships.
    pub fn with_builtin_agents() -> Self {
        let mut registry = Self::new();
        super::normal::register(&mut registry);
        super::analyze::register(&mut registry);
        super::malicious::register(&mut registry);
        super::math_solver::register(&mut registry);
        super::final_refer::register(&mut registry);
        super::final_decision::register(&mut registry);
        super::majority_vote::register(&mut registry);
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&AgentArgs) -> Result<Spawned> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build a unit for the agent registered as `name`.
    pub fn resolve(&self, name: &str, args: &AgentArgs) -> Result<Unit> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| GraphError::UnknownAgent(name.to_string()))?;
        let spawned = factory(args)?;
        Ok(Unit::new(args.id.clone(), name, spawned.role, spawned.agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockModel;

    #[test]
    fn builtin_agents_are_registered() {
        let registry = AgentRegistry::with_builtin_agents();
        for name in [
            "normalAgent",
            "AnalyzeAgent",
            "maliciousAgent",
            "MathSolver",
            "FinalRefer",
            "FinalDecision",
            "FinalMajorityVote",
        ] {
            assert!(registry.contains(name), "{name} missing");
        }
    }

    #[test]
    fn unknown_agent_is_an_error() {
        let registry = AgentRegistry::with_builtin_agents();
        let err = registry.resolve("Oracle", &AgentArgs::new(0)).unwrap_err();
        assert!(matches!(err, GraphError::UnknownAgent(name) if name == "Oracle"));
    }

    #[test]
    fn resolve_applies_id_and_role_override() {
        let registry = AgentRegistry::with_builtin_agents();
        let args = AgentArgs::new(0)
            .with_id("n1")
            .with_role("special_agent")
            .with_llm(Arc::new(MockModel::default()));

        let unit = registry.resolve("normalAgent", &args).unwrap();

        assert_eq!(unit.id(), "n1");
        assert_eq!(unit.role(), "special_agent");
        assert_eq!(unit.agent_name(), "normalAgent");
    }

    #[test]
    fn normal_agent_without_model_is_a_config_error() {
        let registry = AgentRegistry::with_builtin_agents();
        assert!(matches!(
            registry.resolve("normalAgent", &AgentArgs::new(0)),
            Err(GraphError::Config(_))
        ));
    }
}
