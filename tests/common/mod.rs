#![allow(dead_code)]

use serde_json::{Value, json};

pub use agentgraph_test_utils::fake_agent::call_log;
pub use agentgraph_test_utils::{CallLog, init_tracing};

/// The conventional run input.
pub fn task(text: &str) -> Value {
    json!({ "task": text })
}

/// Snapshot of a call log.
pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
