// src/llm/mock.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;

use super::{ChatMessage, ChatRole, LanguageModel};

/// Deterministic offline model.
///
/// Replies with a fixed text, optionally after a delay on the async path.
/// Counts calls so tests can check how often a unit reached the model.
#[derive(Debug)]
pub struct MockModel {
    reply: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl Default for MockModel {
    fn default() -> Self {
        Self {
            reply: "The answer is 42.".to_string(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl MockModel {
    pub const NAME: &'static str = "mock";

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !messages.iter().any(|m| m.role == ChatRole::User) {
            anyhow::bail!("mock model needs at least one user message");
        }
        Ok(self.reply.clone())
    }
}

impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.respond(messages)
    }

    fn generate_async<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.respond(messages)
        })
    }
}
