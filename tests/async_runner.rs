// tests/async_runner.rs

mod common;
use crate::common::{call_log, calls, task};

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use serde_json::json;

use agentgraph::types::RunOptions;
use agentgraph_test_utils::{GraphBuilder, ScriptedAgent, TopologyBuilder, with_timeout};

fn one_round() -> RunOptions {
    RunOptions::default().with_rounds(1)
}

#[tokio::test]
async fn concurrent_frontier_overlaps_independent_units() {
    let delay = Duration::from_millis(150);
    let mut graph = GraphBuilder::new()
        .unit(ScriptedAgent::new("a").with_delay(delay))
        .unit(ScriptedAgent::new("b").with_delay(delay))
        .unit(ScriptedAgent::new("c").with_delay(delay))
        .build();

    let started = Instant::now();
    let outcome = with_timeout(graph.arun(&task("t"), &one_round().with_concurrent_frontier(true)))
        .await
        .unwrap();

    assert!(started.elapsed() < delay * 3);
    assert_eq!(outcome.rounds[0].executed, vec!["u0", "u1", "u2"]);
    assert_eq!(outcome.answers, vec![json!("a"), json!("b"), json!("c")]);
}

#[tokio::test]
async fn report_keeps_frontier_order_when_completion_order_differs() {
    let log = call_log();
    let mut graph = GraphBuilder::new()
        .unit(
            ScriptedAgent::new("slow")
                .with_delay(Duration::from_millis(80))
                .logging_to(&log),
        )
        .unit(
            ScriptedAgent::new("fast")
                .with_delay(Duration::from_millis(5))
                .logging_to(&log),
        )
        .build();

    let outcome = with_timeout(graph.arun(&task("t"), &one_round().with_concurrent_frontier(true)))
        .await
        .unwrap();

    assert_eq!(calls(&log), vec!["fast", "slow"]);
    assert_eq!(outcome.rounds[0].executed, vec!["u0", "u1"]);
}

#[tokio::test]
async fn chain_order_holds_under_concurrent_frontier() {
    let log = call_log();
    let mut graph = GraphBuilder::new()
        .unit(
            ScriptedAgent::new("first")
                .with_delay(Duration::from_millis(30))
                .logging_to(&log),
        )
        .unit(ScriptedAgent::new("second").logging_to(&log))
        .unit(ScriptedAgent::new("third").logging_to(&log))
        .topology(TopologyBuilder::new(3).chain().build())
        .build();

    with_timeout(graph.arun(&task("t"), &one_round().with_concurrent_frontier(true)))
        .await
        .unwrap();

    assert_eq!(calls(&log), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn sequential_async_runner_matches_blocking_runner() {
    let build = || {
        GraphBuilder::new()
            .unit(ScriptedAgent::new("a"))
            .unit(ScriptedAgent::new("b").failing_first(1))
            .unit(ScriptedAgent::new("c"))
            .topology(TopologyBuilder::new(3).spatial(0, 2).spatial(1, 2).temporal_all().build())
            .build()
    };
    let options = RunOptions::default().with_rounds(3);

    let expected = build().run(&task("t"), &options).unwrap();
    let actual = with_timeout(build().arun(&task("t"), &options)).await.unwrap();

    assert_eq!(actual, expected);
}

#[tokio::test]
async fn retry_delay_spaces_out_attempts() {
    let flaky = ScriptedAgent::new("flaky").failing_first(2);
    let attempts = flaky.attempts();
    let mut graph = GraphBuilder::new().unit(flaky).build();

    let options = one_round()
        .with_max_tries(3)
        .with_retry_delay(Duration::from_millis(40));
    let started = Instant::now();
    let outcome = with_timeout(graph.arun(&task("t"), &options)).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(outcome.rounds[0].failed.is_empty());
}

#[tokio::test]
async fn zero_max_tries_is_rejected() {
    let mut graph = GraphBuilder::new().unit(ScriptedAgent::new("a")).build();

    let err = graph
        .arun(&task("t"), &one_round().with_max_tries(0))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("max_tries"));
}
