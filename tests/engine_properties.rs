//! Engine-level guarantees exercised through the public API only.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde_json::json;
use stepgraph::graphs::{GraphBuilder, Violation};
use stepgraph::node::{NodePartial, node_fn};
use stepgraph::runtimes::{RunnerError, RuntimeConfig};
use stepgraph::state::{FieldKind, State, StateSchema};
use stepgraph::types::NodeKind;
use stepgraph::utils::testing::{CountingNode, counter_schema};

fn looping_app(counter: CountingNode, step_limit: u64) -> stepgraph::App {
    GraphBuilder::new(counter_schema())
        .add_node("tick", counter)
        .and_then(|b| b.set_entry_point("tick"))
        .and_then(|b| b.add_edge("tick", "tick"))
        .unwrap()
        .with_runtime_config(RuntimeConfig::default().with_step_limit(step_limit))
        .compile()
        .unwrap()
}

#[tokio::test]
async fn cycles_never_exceed_the_step_limit() {
    for limit in [1, 7, 50] {
        let counter = CountingNode::default();
        let calls = counter.calls();
        let app = looping_app(counter, limit);
        let err = app.invoke(State::new()).await.unwrap_err();
        assert!(matches!(err, RunnerError::StepLimitExceeded { .. }));
        assert_eq!(calls.load(Ordering::SeqCst) as u64, limit);
    }
}

#[tokio::test]
async fn appends_accumulate_in_execution_order() {
    let schema = StateSchema::new().append("log");
    let mut builder = GraphBuilder::new(schema);
    let names = ["one", "two", "three"];
    for name in names {
        builder = builder
            .add_node(
                name,
                node_fn(move |_: &State| Ok(NodePartial::new().with("log", json!([name])))),
            )
            .unwrap();
    }
    let app = builder
        .set_entry_point("one")
        .and_then(|b| b.add_edge("one", "two"))
        .and_then(|b| b.add_edge("two", "three"))
        .and_then(|b| b.add_edge("three", NodeKind::End))
        .unwrap()
        .compile()
        .unwrap();

    let state = app
        .invoke(State::new().with("log", json!(["seed"])))
        .await
        .unwrap();
    assert_eq!(state.get("log"), Some(&json!(["seed", "one", "two", "three"])));
}

#[tokio::test]
async fn replace_keeps_only_the_last_write() {
    let schema = StateSchema::new().replace("status", FieldKind::String);
    let app = GraphBuilder::new(schema)
        .add_node("draft", node_fn(|_: &State| Ok(NodePartial::new().with("status", "draft"))))
        .and_then(|b| {
            b.add_node("final", node_fn(|_: &State| Ok(NodePartial::new().with("status", "final"))))
        })
        .and_then(|b| b.set_entry_point("draft"))
        .and_then(|b| b.add_edge("draft", "final"))
        .and_then(|b| b.add_edge("final", NodeKind::End))
        .unwrap()
        .compile()
        .unwrap();

    let state = app.invoke(State::new()).await.unwrap();
    assert_eq!(state.get_str("status"), Some("final"));
}

#[test]
fn integrity_error_lists_every_problem() {
    let err = GraphBuilder::new(StateSchema::new())
        .add_node("A", node_fn(|_: &State| Ok(NodePartial::new())))
        .and_then(|b| b.add_node("C", node_fn(|_: &State| Ok(NodePartial::new()))))
        .and_then(|b| b.set_entry_point("A"))
        .and_then(|b| b.add_edge("A", "B"))
        .unwrap()
        .compile()
        .unwrap_err();

    assert!(err.mentions("`B`"));
    assert!(err.violations.contains(&Violation::DanglingNode { node: "C".into() }));
    assert_eq!(err.violations.len(), 2);
}

#[tokio::test]
async fn invoking_twice_gives_identical_results() {
    let counter = CountingNode::default();
    let calls = counter.calls();
    let app = Arc::new(
        GraphBuilder::new(counter_schema())
            .add_node("tick", counter)
            .and_then(|b| b.set_entry_point("tick"))
            .and_then(|b| b.add_edge("tick", NodeKind::End))
            .unwrap()
            .compile()
            .unwrap(),
    );
    let initial = State::new().with("count", 41);
    let a = app.invoke(initial.clone()).await.unwrap();
    let b = app.invoke(initial).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.get("count"), Some(&json!(42)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
