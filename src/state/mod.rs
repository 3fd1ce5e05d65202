//! State container for workflow execution.
//!
//! A [`State`] is a flat map from field name to JSON value. It has value
//! semantics: nodes receive their own copy, and merging a node's update
//! produces a fresh `State` rather than mutating the previous one, so two runs
//! of the same graph can never observe each other's intermediate values.
//!
//! The shape of a state is described by a [`StateSchema`]: every field is
//! declared up front with a [`FieldKind`] and a
//! [`ReducerType`](crate::reducers::ReducerType) that decides how updates are
//! folded in.
//!
//! # Examples
//!
//! ```rust
//! use stepgraph::node::NodePartial;
//! use stepgraph::state::{FieldKind, State, StateSchema};
//! use serde_json::json;
//!
//! let schema = StateSchema::new()
//!     .append("log")
//!     .replace("done", FieldKind::Bool);
//!
//! let s0 = State::new().with("log", json!(["start"]));
//! let s1 = schema
//!     .merge(&s0, &NodePartial::new().with("log", json!(["step"])).with("done", true))
//!     .unwrap();
//!
//! assert_eq!(s1.get("log"), Some(&json!(["start", "step"])));
//! assert_eq!(s1.get_bool("done"), Some(true));
//! // the input is untouched
//! assert_eq!(s0.get("log"), Some(&json!(["start"])));
//! ```

mod schema;

pub use schema::{FieldKind, FieldSpec, MergeOutcome, StateSchema};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::message::Message;

/// Errors raised while validating or merging state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum StateError {
    #[error("unknown state field `{field}`")]
    #[diagnostic(
        code(stepgraph::state::unknown_field),
        help("Declare the field in the StateSchema before compiling the graph.")
    )]
    UnknownField { field: String },

    #[error("state field `{field}` expects a {expected} value, got {found}")]
    #[diagnostic(code(stepgraph::state::type_mismatch))]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Immutable-by-convention mapping of field names to values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    values: FxHashMap<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter used to assemble initial states. No schema checks
    /// happen here; they run when the state enters a graph.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    pub fn get_sequence(&self, field: &str) -> Option<&Vec<Value>> {
        self.get(field).and_then(Value::as_array)
    }

    pub fn get_record(&self, field: &str) -> Option<&Map<String, Value>> {
        self.get(field).and_then(Value::as_object)
    }

    /// Decodes a sequence field as messages, skipping entries of another shape.
    pub fn messages(&self, field: &str) -> Vec<Message> {
        self.get_sequence(field)
            .map(|items| items.iter().filter_map(Message::from_value).collect())
            .unwrap_or_default()
    }

    pub fn last_message(&self, field: &str) -> Option<Message> {
        self.get_sequence(field)
            .and_then(|items| items.last())
            .and_then(Message::from_value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Field names in sorted order, for stable diagnostics.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn into_values(self) -> FxHashMap<String, Value> {
        self.values
    }

    pub(crate) fn insert(&mut self, field: String, value: Value) {
        self.values.insert(field, value);
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for State {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
