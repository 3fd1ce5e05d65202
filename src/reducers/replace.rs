use serde_json::Value;

use super::Reducer;
use crate::state::StateError;

#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq)]
pub struct Replace;

impl Reducer for Replace {
    fn apply(&self, _field: &str, _current: &Value, update: &Value) -> Result<Value, StateError> {
        Ok(update.clone())
    }
}
