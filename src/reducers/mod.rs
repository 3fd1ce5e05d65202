//! Per-field merge policies.
//!
//! Every schema field carries a [`ReducerType`]. When a node returns a
//! [`NodePartial`](crate::node::NodePartial), each updated field is combined
//! with the current value by its reducer. Reducers never see other fields and
//! never mutate their inputs: they return the merged value.

mod append;
mod map_merge;
mod replace;

pub use append::Append;
pub use map_merge::MapMerge;
pub use replace::Replace;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::StateError;

/// Combines the current value of one field with an update for that field.
pub trait Reducer: Send + Sync {
    fn apply(&self, field: &str, current: &Value, update: &Value) -> Result<Value, StateError>;
}

/// Closed set of reducers a schema field can declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReducerType {
    /// New value overwrites the old one.
    #[default]
    Replace,
    /// New sequence elements are concatenated onto the existing sequence.
    Append,
    /// New object keys are shallow-merged into the existing object.
    MapMerge,
}

impl ReducerType {
    pub fn apply(&self, field: &str, current: &Value, update: &Value) -> Result<Value, StateError> {
        match self {
            ReducerType::Replace => Replace.apply(field, current, update),
            ReducerType::Append => Append.apply(field, current, update),
            ReducerType::MapMerge => MapMerge.apply(field, current, update),
        }
    }
}

/// Short JSON type name used in mismatch diagnostics.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "record",
    }
}
