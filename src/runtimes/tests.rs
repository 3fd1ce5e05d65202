use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::app::App;
use crate::graphs::GraphBuilder;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodePartial, node_fn};
use crate::state::{State, StateError};
use crate::types::NodeKind;
use crate::utils::id_generator::{IdConfig, has_prefix};
use crate::utils::testing::{FailingNode, TestNode, chat_schema, counter_loop_app, linear_app};

fn contents(state: &State) -> Vec<String> {
    state
        .messages("messages")
        .into_iter()
        .map(|m| m.content)
        .collect()
}

/// Cancels `token` while running, so the run stops before the next step.
struct CancelsToken(CancellationToken);

#[async_trait]
impl Node for CancelsToken {
    async fn run(&self, _snapshot: State, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        self.0.cancel();
        Ok(NodePartial::new().with_messages("messages", [Message::assistant("cancelling")]))
    }
}

/// Records the context it was handed.
struct EchoContext;

#[async_trait]
impl Node for EchoContext {
    async fn run(&self, _snapshot: State, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_messages(
            "messages",
            [Message::assistant(&format!("{}|{}|{}", ctx.node_id, ctx.step, ctx.run_id))],
        ))
    }
}

fn two_step_app(first: impl Node + 'static, second: impl Node + 'static) -> App {
    two_step_app_with(first, second, RuntimeConfig::default())
}

fn two_step_app_with(
    first: impl Node + 'static,
    second: impl Node + 'static,
    config: RuntimeConfig,
) -> App {
    GraphBuilder::new(chat_schema())
        .add_node("first", first)
        .and_then(|b| b.add_node("second", second))
        .and_then(|b| b.set_entry_point("first"))
        .and_then(|b| b.add_edge("first", "second"))
        .and_then(|b| b.add_edge("second", NodeKind::End))
        .unwrap()
        .with_runtime_config(config)
        .compile()
        .unwrap()
}

#[tokio::test]
async fn test_linear_run_reaches_end() {
    let app = linear_app(&["a", "b", "c"]);
    let state = app.invoke(State::new()).await.unwrap();
    assert_eq!(
        contents(&state),
        vec!["ran:a:step:1", "ran:b:step:2", "ran:c:step:3"]
    );
    assert_eq!(state.get("wants_joke"), Some(&json!(null)));
}

#[tokio::test]
async fn test_stepwise_reports() {
    let app = linear_app(&["a", "b"]);
    let mut run = app.execution(app.initial_state()).unwrap();
    assert_eq!(run.current(), &NodeKind::from("a"));

    let first = run.run_step().await.unwrap().unwrap();
    assert_eq!(
        first,
        StepReport {
            step: 1,
            ran: NodeKind::from("a"),
            updated_fields: vec!["messages".into()],
            next: NodeKind::from("b"),
            completed: false,
        }
    );

    let second = run.run_step().await.unwrap().unwrap();
    assert_eq!(second.ran, NodeKind::from("b"));
    assert_eq!(second.next, NodeKind::End);
    assert!(second.completed);
    assert!(run.is_complete());

    assert_eq!(run.run_step().await.unwrap(), None);
    assert_eq!(run.step(), 2);
    assert_eq!(contents(run.state()), vec!["ran:a:step:1", "ran:b:step:2"]);
}

#[tokio::test]
async fn test_nodes_receive_context() {
    let ids = IdConfig {
        seed: Some(3),
        namespace: None,
    };
    let app = two_step_app_with(
        EchoContext,
        EchoContext,
        RuntimeConfig::default().with_ids(ids),
    );
    let run = app.execution(State::new()).unwrap();
    assert_eq!(run.run_id(), "run-seeded-3-0");

    let state = run.run_until_complete().await.unwrap();
    assert_eq!(
        contents(&state),
        vec!["first|1|run-seeded-3-0", "second|2|run-seeded-3-0"]
    );

    // the next run of the same app gets the next id
    let again = app.invoke(State::new()).await.unwrap();
    assert_eq!(contents(&again)[0], "first|1|run-seeded-3-1");
}

#[tokio::test]
async fn test_default_run_ids_differ_per_run() {
    let app = linear_app(&["a"]);
    let first = app.execution(State::new()).unwrap().run_id().to_string();
    let second = app.execution(State::new()).unwrap().run_id().to_string();
    assert!(has_prefix(&first, "run"));
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_cycle_stops_at_step_limit() {
    let app = counter_loop_app(None, RuntimeConfig::default().with_step_limit(5));
    let err = app.invoke(State::new()).await.unwrap_err();
    match &err {
        RunnerError::StepLimitExceeded { limit, node, state } => {
            assert_eq!(*limit, 5);
            assert_eq!(node, "tick");
            assert_eq!(state.get("count"), Some(&json!(5)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.node(), Some("tick"));
}

#[tokio::test]
async fn test_decision_sees_post_merge_state() {
    let app = counter_loop_app(Some(3), RuntimeConfig::default());
    let state = app.invoke(State::new()).await.unwrap();
    assert_eq!(state.get("count"), Some(&json!(3)));
    // one run per count value; a decision on pre-merge state would run once more
    assert_eq!(state.get("trail"), Some(&json!([0, 1, 2])));
}

#[tokio::test]
async fn test_unmapped_label_is_an_error() {
    let app = GraphBuilder::new(chat_schema())
        .add_node("decide", TestNode { name: "decide" })
        .and_then(|b| b.add_node("yes", TestNode { name: "yes" }))
        .and_then(|b| b.set_entry_point("decide"))
        .and_then(|b| {
            b.add_dynamic_conditional_edge(
                "decide",
                |_: &State| "maybe".to_string(),
                [("yes", NodeKind::from("yes"))],
            )
        })
        .and_then(|b| b.add_edge("yes", NodeKind::End))
        .unwrap()
        .compile()
        .unwrap();

    let err = app.invoke(State::new()).await.unwrap_err();
    match &err {
        RunnerError::UnroutableBranch {
            node,
            label,
            known,
            step,
            state,
        } => {
            assert_eq!(node, "decide");
            assert_eq!(label, "maybe");
            assert_eq!(known, &vec!["yes".to_string()]);
            assert_eq!(*step, 1);
            assert_eq!(contents(state), vec!["ran:decide:step:1"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_node_failure_names_the_node() {
    let app = two_step_app(TestNode { name: "first" }, FailingNode::default());
    let err = app.invoke(State::new()).await.unwrap_err();
    match &err {
        RunnerError::NodeExecution {
            node, step, source, ..
        } => {
            assert_eq!(node, "second");
            assert_eq!(*step, 2);
            assert!(matches!(source, NodeError::MissingInput { what: "test_key" }));
        }
        other => panic!("unexpected error: {other}"),
    }
    let last = err.last_state().unwrap();
    assert_eq!(contents(last), vec!["ran:first:step:1"]);
    assert!(err.to_string().contains("node `second` failed at step 2"));
}

#[tokio::test]
async fn test_failed_step_leaves_execution_in_place() {
    let app = two_step_app(TestNode { name: "first" }, FailingNode::default());
    let mut run = app.execution(State::new()).unwrap();
    run.run_step().await.unwrap();
    assert!(run.run_step().await.is_err());
    assert_eq!(run.current(), &NodeKind::from("second"));
    assert_eq!(run.step(), 1);
}

#[tokio::test]
async fn test_undeclared_runtime_write_fails_the_merge() {
    let sneaky = node_fn(|_: &State| Ok(NodePartial::new().with("ghost", 1)));
    let app = two_step_app(TestNode { name: "first" }, sneaky);
    let err = app.invoke(State::new()).await.unwrap_err();
    match err {
        RunnerError::Merge {
            node,
            step,
            source,
            state,
        } => {
            assert_eq!(node, "second");
            assert_eq!(step, 2);
            assert_eq!(
                source,
                StateError::UnknownField {
                    field: "ghost".into()
                }
            );
            assert!(!state.contains("ghost"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_invalid_initial_state_is_rejected() {
    let app = linear_app(&["a"]);
    let err = app
        .invoke(State::new().with("wants_joke", "sure"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RunnerError::InvalidInitialState {
            source: StateError::TypeMismatch { .. }
        }
    ));
    assert!(err.last_state().is_none());
}

#[tokio::test]
async fn test_cancelled_token_stops_before_first_step() {
    let app = linear_app(&["a"]);
    let token = CancellationToken::new();
    token.cancel();
    let err = app
        .invoke_with_cancellation(State::new(), token)
        .await
        .unwrap_err();
    match err {
        RunnerError::Cancelled { reason, step, state } => {
            assert_eq!(reason, CancelReason::Requested);
            assert_eq!(step, 0);
            assert!(contents(&state).is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_cancellation_between_steps() {
    let token = CancellationToken::new();
    let app = two_step_app(CancelsToken(token.clone()), TestNode { name: "second" });
    let err = app
        .invoke_with_cancellation(State::new(), token)
        .await
        .unwrap_err();
    match err {
        RunnerError::Cancelled { step, state, .. } => {
            assert_eq!(step, 1);
            assert_eq!(contents(&state), vec!["cancelling"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_elapsed_deadline_cancels() {
    let app = counter_loop_app(
        None,
        RuntimeConfig::default().with_deadline(Duration::ZERO),
    );
    let err = app.invoke(State::new()).await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Cancelled {
            reason: CancelReason::DeadlineElapsed,
            step: 0,
            ..
        }
    ));
}

#[tokio::test]
async fn test_concurrent_invocations_are_isolated() {
    let app = Arc::new(counter_loop_app(Some(6), RuntimeConfig::default()));
    let handles: Vec<_> = (0..6i64)
        .map(|start| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                let state = app.invoke(State::new().with("count", start)).await?;
                Ok::<_, RunnerError>((start, state))
            })
        })
        .collect();

    for handle in handles {
        let (start, state) = handle.await.unwrap().unwrap();
        let expected: Vec<i64> = (start..6).collect();
        assert_eq!(state.get("trail"), Some(&json!(expected)));
        assert_eq!(state.get("count"), Some(&json!(6)));
    }
}
