//! Shared test nodes and graph fixtures.
//!
//! Used by the unit tests, the integration tests under `tests/` and the doc
//! examples, so they stay public.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use crate::app::App;
use crate::graphs::GraphBuilder;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::runtimes::RuntimeConfig;
use crate::state::{FieldKind, State, StateSchema};
use crate::types::NodeKind;

/// `messages` (append) plus `wants_joke` (bool, replace).
pub fn chat_schema() -> StateSchema {
    StateSchema::new()
        .append("messages")
        .replace("wants_joke", FieldKind::Bool)
}

/// `count` (number, replace) plus `trail` (append).
pub fn counter_schema() -> StateSchema {
    StateSchema::new()
        .replace("count", FieldKind::Number)
        .append("trail")
}

/// Appends `ran:{name}:step:{step}` to `messages`.
#[derive(Debug, Clone)]
pub struct TestNode {
    pub name: &'static str,
}

#[async_trait]
impl Node for TestNode {
    async fn run(&self, _snapshot: State, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_messages(
            "messages",
            [Message::assistant(&format!(
                "ran:{}:step:{}",
                self.name, ctx.step
            ))],
        ))
    }

    fn writes(&self) -> &[&'static str] {
        &["messages"]
    }
}

/// Always fails with [`NodeError::MissingInput`].
#[derive(Debug, Clone)]
pub struct FailingNode {
    pub error_message: &'static str,
}

impl Default for FailingNode {
    fn default() -> Self {
        Self {
            error_message: "test_key",
        }
    }
}

#[async_trait]
impl Node for FailingNode {
    async fn run(&self, _snapshot: State, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        Err(NodeError::MissingInput {
            what: self.error_message,
        })
    }
}

/// Increments `count` and records the value it saw in `trail`. Counts its
/// own invocations so tests can check how often it ran.
#[derive(Debug, Default)]
pub struct CountingNode {
    pub calls: Arc<AtomicUsize>,
}

impl CountingNode {
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Node for CountingNode {
    async fn run(&self, snapshot: State, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let seen = snapshot
            .get("count")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        Ok(NodePartial::new()
            .with("count", seen + 1)
            .with("trail", json!([seen])))
    }

    fn writes(&self) -> &[&'static str] {
        &["count", "trail"]
    }
}

/// A chain of [`TestNode`]s, `names[0]` -> ... -> `End`, over [`chat_schema`].
///
/// # Panics
/// If `names` is empty or repeats a name.
pub fn linear_app(names: &[&'static str]) -> App {
    let mut builder = GraphBuilder::new(chat_schema());
    for &name in names {
        builder = builder
            .add_node(name, TestNode { name })
            .expect("unique test node names");
    }
    builder = builder
        .set_entry_point(names[0])
        .expect("first entry point");
    for pair in names.windows(2) {
        builder = builder.add_edge(pair[0], pair[1]).expect("chain edge");
    }
    let last = names[names.len() - 1];
    builder
        .add_edge(last, NodeKind::End)
        .expect("final edge")
        .compile()
        .expect("linear graph compiles")
}

/// `tick` loops on itself while `count < stop_at`, then ends.
///
/// With `stop_at = None` it never ends, which is what step-limit tests want.
pub fn counter_loop_app(stop_at: Option<i64>, config: RuntimeConfig) -> App {
    GraphBuilder::new(counter_schema())
        .add_node("tick", CountingNode::default())
        .and_then(|b| b.set_entry_point("tick"))
        .and_then(|b| {
            b.add_conditional_edge(
                "tick",
                move |s: &State| {
                    let count = s.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
                    stop_at.is_none_or(|limit| count < limit)
                },
                [(true, NodeKind::from("tick")), (false, NodeKind::End)],
            )
        })
        .expect("counter graph registers")
        .with_runtime_config(config)
        .compile()
        .expect("counter graph compiles")
}
