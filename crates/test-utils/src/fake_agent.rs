use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentgraph::graph::unit::{Agent, AgentOutput, ExecutionContext, NeighbourInfo};
use anyhow::{Result, bail};
use futures::future::BoxFuture;
use serde_json::{Value, json};

/// Shared, ordered record of which agents executed.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

type OutputFn = Arc<dyn Fn(&ExecutionContext<'_>) -> Value + Send + Sync>;

/// A fake agent that:
/// - appends its label to a shared call log on every attempt
/// - fails its first `fail_first` attempts
/// - otherwise returns its label, or whatever the output closure computes
#[derive(Clone)]
pub struct ScriptedAgent {
    label: String,
    fail_first: usize,
    attempts: Arc<AtomicUsize>,
    log: Option<CallLog>,
    output: Option<OutputFn>,
    delay: Option<Duration>,
}

impl ScriptedAgent {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fail_first: 0,
            attempts: Arc::new(AtomicUsize::new(0)),
            log: None,
            output: None,
            delay: None,
        }
    }

    pub fn failing_first(mut self, attempts: usize) -> Self {
        self.fail_first = attempts;
        self
    }

    pub fn always_failing(self) -> Self {
        self.failing_first(usize::MAX)
    }

    pub fn logging_to(mut self, log: &CallLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn with_output<F>(mut self, f: F) -> Self
    where
        F: Fn(&ExecutionContext<'_>) -> Value + Send + Sync + 'static,
    {
        self.output = Some(Arc::new(f));
        self
    }

    /// Sleep on the async path before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle on the attempt counter; stays valid after the agent is boxed.
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }

    fn attempt(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
        if let Some(ref log) = self.log {
            log.lock().unwrap().push(self.label.clone());
        }
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            bail!("{} scripted failure on attempt {}", self.label, n + 1);
        }
        let value = match self.output {
            Some(ref f) => f(ctx),
            None => json!(self.label),
        };
        Ok(AgentOutput::Single(value))
    }
}

impl Agent for ScriptedAgent {
    fn process_inputs(&self, raw_input: &Value, _neighbours: &NeighbourInfo) -> Result<Vec<Value>> {
        Ok(vec![raw_input.clone()])
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
        self.attempt(ctx)
    }

    fn execute_async<'a>(&'a self, ctx: &'a ExecutionContext<'a>) -> BoxFuture<'a, Result<AgentOutput>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.attempt(ctx)
        })
    }
}

/// Decision stand-in: returns every spatial peer output as a batch and
/// remembers which peer ids it saw.
#[derive(Clone, Default)]
pub struct PeerCollector {
    seen: Arc<Mutex<Vec<String>>>,
}

impl PeerCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.seen)
    }
}

impl Agent for PeerCollector {
    fn process_inputs(&self, _raw_input: &Value, _neighbours: &NeighbourInfo) -> Result<Vec<Value>> {
        Ok(vec![])
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<AgentOutput> {
        let mut seen = self.seen.lock().unwrap();
        seen.clear();
        seen.extend(ctx.neighbours.spatial.iter().map(|p| p.unit_id.clone()));
        Ok(AgentOutput::Batch(
            ctx.neighbours.spatial.iter().map(|p| p.output.clone()).collect(),
        ))
    }

    fn execute_async<'a>(&'a self, ctx: &'a ExecutionContext<'a>) -> BoxFuture<'a, Result<AgentOutput>> {
        Box::pin(async move { self.execute(ctx) })
    }
}
