use serde_json::Value;

use super::{Reducer, json_type_name};
use crate::state::StateError;

/// Sequence concatenation. A `null` current value counts as an empty sequence;
/// order is preserved and duplicates are kept.
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq)]
pub struct Append;

impl Reducer for Append {
    fn apply(&self, field: &str, current: &Value, update: &Value) -> Result<Value, StateError> {
        let Value::Array(items) = update else {
            return Err(StateError::TypeMismatch {
                field: field.to_string(),
                expected: "sequence",
                found: json_type_name(update),
            });
        };
        let mut merged = match current {
            Value::Null => Vec::with_capacity(items.len()),
            Value::Array(existing) => existing.clone(),
            other => {
                return Err(StateError::TypeMismatch {
                    field: field.to_string(),
                    expected: "sequence",
                    found: json_type_name(other),
                });
            }
        };
        merged.extend(items.iter().cloned());
        Ok(Value::Array(merged))
    }
}
