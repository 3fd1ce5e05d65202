//! Node abstraction: the step functions a graph is made of.
//!
//! A node receives its own copy of the current [`State`] and returns a
//! [`NodePartial`] naming only the fields it changes. The engine merges the
//! partial through the schema; nodes never write to shared state directly.
//!
//! Implement [`Node`] for stateful steps, or wrap a plain function with
//! [`node_fn`]:
//!
//! ```
//! use stepgraph::node::{node_fn, NodeError, NodePartial};
//! use stepgraph::state::State;
//!
//! let set_modality = node_fn(|_state: &State| -> Result<NodePartial, NodeError> {
//!     Ok(NodePartial::new().with("modality", "advance payment"))
//! })
//! .writes_fields(&["modality"]);
//! ```

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::message::Message;
use crate::state::State;

/// Per-invocation context handed to a node.
#[derive(Clone, Debug)]
pub struct NodeContext {
    pub node_id: String,
    /// 1-based count of node executions in the current run.
    pub step: u64,
    pub run_id: String,
}

/// Failures reported by node implementations.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(stepgraph::node::missing_input),
        help("Check that an upstream node writes this field before this node runs.")
    )]
    MissingInput { what: &'static str },

    #[error("invalid input: {0}")]
    #[diagnostic(code(stepgraph::node::invalid_input))]
    InvalidInput(String),

    #[error(transparent)]
    #[diagnostic(code(stepgraph::node::serde_json))]
    Serde(#[from] serde_json::Error),
}

/// The fields a node changes. Anything not named here carries over untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePartial {
    updates: FxHashMap<String, Value>,
}

impl NodePartial {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Convenience for append-reduced message logs: wraps the messages in a
    /// sequence update.
    #[must_use]
    pub fn with_messages(
        self,
        field: impl Into<String>,
        messages: impl IntoIterator<Item = Message>,
    ) -> Self {
        let items: Vec<Value> = messages.into_iter().map(Value::from).collect();
        self.with(field, Value::Array(items))
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.updates.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.updates.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Updated field names, sorted so merges and diagnostics are deterministic.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.updates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for NodePartial {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            updates: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, snapshot: State, ctx: NodeContext) -> Result<NodePartial, NodeError>;

    /// Fields this node may write. Checked against the schema when the graph
    /// compiles; an empty slice opts out of the check.
    fn writes(&self) -> &[&'static str] {
        &[]
    }
}

/// Adapter turning a synchronous `&State -> NodePartial` function into a [`Node`].
pub struct FnNode<F> {
    step: F,
    writes: Vec<&'static str>,
}

/// Wraps a step function as a node.
pub fn node_fn<F>(step: F) -> FnNode<F>
where
    F: Fn(&State) -> Result<NodePartial, NodeError> + Send + Sync + 'static,
{
    FnNode {
        step,
        writes: Vec::new(),
    }
}

impl<F> FnNode<F> {
    /// Declares the fields the wrapped function writes.
    #[must_use]
    pub fn writes_fields(mut self, fields: &[&'static str]) -> Self {
        self.writes = fields.to_vec();
        self
    }
}

#[async_trait]
impl<F> Node for FnNode<F>
where
    F: Fn(&State) -> Result<NodePartial, NodeError> + Send + Sync + 'static,
{
    async fn run(&self, snapshot: State, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        (self.step)(&snapshot)
    }

    fn writes(&self) -> &[&'static str] {
        &self.writes
    }
}
