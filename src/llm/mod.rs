// src/llm/mod.rs

//! Language model abstraction.
//!
//! Agents talk to a [`LanguageModel`] instead of a concrete client. The crate
//! only ships [`MockModel`]; real transports plug in behind the same trait.
//!
//! - [`mock`] provides the deterministic model used by default and in tests.

pub mod mock;

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, Result};

pub use mock::MockModel;

/// Speaker of one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Text generation capability used by prompt-building agents.
///
/// Retries, rate limiting and transport are the implementation's concern.
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;

    fn generate_async<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, anyhow::Result<String>>;
}

/// Resolve a model by name. An empty name means the mock model.
pub fn resolve_model(name: &str) -> Result<Arc<dyn LanguageModel>> {
    match name.trim() {
        "" | MockModel::NAME => Ok(Arc::new(MockModel::default())),
        other => Err(GraphError::UnknownModel(other.to_string())),
    }
}
