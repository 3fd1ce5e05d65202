use serde_json::Value;

use super::{Reducer, json_type_name};
use crate::state::StateError;

/// Shallow object merge: keys in the update overwrite keys in the current record.
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq)]
pub struct MapMerge;

impl Reducer for MapMerge {
    fn apply(&self, field: &str, current: &Value, update: &Value) -> Result<Value, StateError> {
        let Value::Object(entries) = update else {
            return Err(StateError::TypeMismatch {
                field: field.to_string(),
                expected: "record",
                found: json_type_name(update),
            });
        };
        let mut merged = match current {
            Value::Null => serde_json::Map::new(),
            Value::Object(existing) => existing.clone(),
            other => {
                return Err(StateError::TypeMismatch {
                    field: field.to_string(),
                    expected: "record",
                    found: json_type_name(other),
                });
            }
        };
        for (k, v) in entries {
            merged.insert(k.clone(), v.clone());
        }
        Ok(Value::Object(merged))
    }
}
