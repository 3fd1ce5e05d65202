use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::{State, StateError};
use crate::node::NodePartial;
use crate::reducers::{ReducerType, json_type_name};

/// Declared semantic type of a state field.
///
/// `null` is accepted for every kind and stands for "not set yet".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Bool,
    Number,
    Record,
    Sequence,
    Any,
}

impl FieldKind {
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (FieldKind::Any, _) => true,
            (FieldKind::String, Value::String(_)) => true,
            (FieldKind::Bool, Value::Bool(_)) => true,
            (FieldKind::Number, Value::Number(_)) => true,
            (FieldKind::Record, Value::Object(_)) => true,
            (FieldKind::Sequence, Value::Array(_)) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Bool => "bool",
            FieldKind::Number => "number",
            FieldKind::Record => "record",
            FieldKind::Sequence => "sequence",
            FieldKind::Any => "any",
        }
    }

    /// Value a field holds before anything writes it.
    fn initial_value(&self, reducer: ReducerType) -> Value {
        match (self, reducer) {
            (FieldKind::Sequence, ReducerType::Append) => Value::Array(Vec::new()),
            _ => Value::Null,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub reducer: ReducerType,
}

impl FieldSpec {
    /// Whether the reducer can ever accept a value of the declared kind.
    /// `Append` needs a sequence and `MapMerge` a record; `Any` fits both.
    #[must_use]
    pub fn is_coherent(&self) -> bool {
        match self.reducer {
            ReducerType::Replace => true,
            ReducerType::Append => matches!(self.kind, FieldKind::Sequence | FieldKind::Any),
            ReducerType::MapMerge => matches!(self.kind, FieldKind::Record | FieldKind::Any),
        }
    }
}

/// Result of a tracked merge: the new state plus the fields whose value changed.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutcome {
    pub state: State,
    pub updated: Vec<String>,
}

/// The declared fields of a graph's state and how each one merges.
///
/// Field declarations are builder-style; redeclaring a field replaces its spec.
/// A reducer that cannot take the declared kind (see [`FieldSpec::is_coherent`])
/// is reported when the graph compiles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSchema {
    fields: FxHashMap<String, FieldSpec>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Declares a field whose updates overwrite the previous value.
    #[must_use]
    pub fn replace(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.with_field(
            name,
            FieldSpec {
                kind,
                reducer: ReducerType::Replace,
            },
        )
    }

    /// Declares a sequence field whose updates are appended, e.g. a message log.
    #[must_use]
    pub fn append(self, name: impl Into<String>) -> Self {
        self.with_field(
            name,
            FieldSpec {
                kind: FieldKind::Sequence,
                reducer: ReducerType::Append,
            },
        )
    }

    /// Declares a record field whose updates are shallow-merged key by key.
    #[must_use]
    pub fn map_merge(self, name: impl Into<String>) -> Self {
        self.with_field(
            name,
            FieldSpec {
                kind: FieldKind::Record,
                reducer: ReducerType::MapMerge,
            },
        )
    }

    pub fn get(&self, field: &str) -> Option<&FieldSpec> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// A state holding every declared field at its unset value.
    pub fn initial_state(&self) -> State {
        self.fields
            .iter()
            .map(|(name, spec)| (name.clone(), spec.kind.initial_value(spec.reducer)))
            .collect()
    }

    fn spec_for(&self, field: &str) -> Result<&FieldSpec, StateError> {
        self.fields.get(field).ok_or_else(|| StateError::UnknownField {
            field: field.to_string(),
        })
    }

    fn check_kind(field: &str, spec: &FieldSpec, value: &Value) -> Result<(), StateError> {
        if spec.kind.accepts(value) {
            Ok(())
        } else {
            Err(StateError::TypeMismatch {
                field: field.to_string(),
                expected: spec.kind.name(),
                found: json_type_name(value),
            })
        }
    }

    /// Checks every field of `state` against the schema.
    pub fn validate(&self, state: &State) -> Result<(), StateError> {
        for name in state.field_names() {
            let spec = self.spec_for(name)?;
            if let Some(value) = state.get(name) {
                Self::check_kind(name, spec, value)?;
            }
        }
        Ok(())
    }

    /// Validates a caller-supplied initial state and fills declared-but-missing
    /// fields with their unset value.
    pub fn prepare(&self, state: State) -> Result<State, StateError> {
        self.validate(&state)?;
        let mut prepared = state;
        for (name, spec) in &self.fields {
            if !prepared.contains(name) {
                prepared.insert(name.clone(), spec.kind.initial_value(spec.reducer));
            }
        }
        Ok(prepared)
    }

    /// Folds `partial` into `current` and returns the new state.
    ///
    /// Fields absent from the partial carry over unchanged. The whole partial is
    /// rejected if any field is undeclared or has the wrong shape.
    pub fn merge(&self, current: &State, partial: &NodePartial) -> Result<State, StateError> {
        self.merge_tracked(current, partial).map(|outcome| outcome.state)
    }

    /// Like [`StateSchema::merge`], also reporting which fields changed value.
    pub fn merge_tracked(
        &self,
        current: &State,
        partial: &NodePartial,
    ) -> Result<MergeOutcome, StateError> {
        let mut next = current.clone();
        let mut updated = Vec::new();
        for field in partial.field_names() {
            let Some(update) = partial.get(field) else {
                continue;
            };
            let spec = self.spec_for(field)?;
            Self::check_kind(field, spec, update)?;
            let before = current.get(field).unwrap_or(&Value::Null);
            let merged = spec.reducer.apply(field, before, update)?;
            if &merged != before {
                updated.push(field.to_string());
            }
            trace!(field, reducer = ?spec.reducer, "merged field");
            next.insert(field.to_string(), merged);
        }
        Ok(MergeOutcome {
            state: next,
            updated,
        })
    }
}
