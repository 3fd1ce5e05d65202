//! The compiled, immutable form of a workflow graph.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::graphs::Edge;
use crate::node::{Node, NodePartial};
use crate::runtimes::{Execution, RunnerError, RuntimeConfig};
use crate::state::{MergeOutcome, State, StateError, StateSchema};
use crate::types::NodeKind;
use crate::utils::id_generator::IdGenerator;

/// Why a transition out of a node could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RouteError {
    Unroutable { label: String, known: Vec<String> },
    NoEdge,
}

/// A validated graph, ready to run.
///
/// Produced only by [`GraphBuilder::compile`](crate::graphs::GraphBuilder::compile).
/// Holds no per-run state, so one `App` can be shared (e.g. behind an `Arc`) and
/// invoked concurrently; each invocation owns its own state lineage and gets
/// its own run id.
pub struct App {
    schema: StateSchema,
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Edge>,
    entry: NodeKind,
    runtime_config: RuntimeConfig,
    ids: IdGenerator,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("entry", &self.entry)
            .field("nodes", &self.node_names())
            .field("schema", &self.schema)
            .field("runtime_config", &self.runtime_config)
            .finish_non_exhaustive()
    }
}

impl App {
    pub(crate) fn from_parts(
        schema: StateSchema,
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        edges: FxHashMap<NodeKind, Edge>,
        entry: NodeKind,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            ids: IdGenerator::with_config(runtime_config.ids.clone()),
            schema,
            nodes,
            edges,
            entry,
            runtime_config,
        }
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn entry_point(&self) -> &NodeKind {
        &self.entry
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// Registered node names, sorted.
    pub fn node_names(&self) -> Vec<&NodeKind> {
        let mut names: Vec<&NodeKind> = self.nodes.keys().collect();
        names.sort_unstable();
        names
    }

    pub fn edge(&self, from: &NodeKind) -> Option<&Edge> {
        self.edges.get(from)
    }

    pub(crate) fn next_run_id(&self) -> String {
        self.ids.generate_run_id()
    }

    pub(crate) fn node(&self, kind: &NodeKind) -> Option<&Arc<dyn Node>> {
        self.nodes.get(kind)
    }

    /// Every schema field at its unset value; a convenient base for initial states.
    pub fn initial_state(&self) -> State {
        self.schema.initial_state()
    }

    /// Starts a stepwise run. The initial state is checked against the schema.
    pub fn execution(&self, initial: State) -> Result<Execution<'_>, RunnerError> {
        let state = self
            .schema
            .prepare(initial)
            .map_err(|source| RunnerError::InvalidInitialState { source })?;
        Ok(Execution::new(self, state))
    }

    /// Runs the graph from the entry point until it reaches `End`.
    #[instrument(skip(self, initial), fields(entry = %self.entry), err)]
    pub async fn invoke(&self, initial: State) -> Result<State, RunnerError> {
        self.execution(initial)?.run_until_complete().await
    }

    /// Like [`App::invoke`], aborting with
    /// [`RunnerError::Cancelled`] once `cancel` fires. The token is checked
    /// between steps; a node that is already running completes first.
    #[instrument(skip(self, initial, cancel), fields(entry = %self.entry), err)]
    pub async fn invoke_with_cancellation(
        &self,
        initial: State,
        cancel: CancellationToken,
    ) -> Result<State, RunnerError> {
        self.execution(initial)?
            .with_cancellation(cancel)
            .run_until_complete()
            .await
    }

    /// Merges one node's partial into `state` through the schema reducers.
    pub fn apply_barrier(
        &self,
        state: &State,
        node: &NodeKind,
        partial: &NodePartial,
    ) -> Result<MergeOutcome, StateError> {
        let outcome = self.schema.merge_tracked(state, partial)?;
        debug!(
            node = %node,
            written = partial.len(),
            updated = ?outcome.updated,
            "applied barrier"
        );
        Ok(outcome)
    }

    /// Resolves the transition out of `from`, evaluating any decision function
    /// against `state` (the post-merge state of `from`).
    pub(crate) fn route(&self, from: &NodeKind, state: &State) -> Result<NodeKind, RouteError> {
        match self.edges.get(from) {
            Some(Edge::Fixed(to)) => Ok(to.clone()),
            Some(Edge::Conditional(cond)) => {
                let label = cond.decide(state);
                match cond.resolve(&label) {
                    Some(to) => {
                        debug!(from = %from, label = %label, to = %to, "branch taken");
                        Ok(to.clone())
                    }
                    None => Err(RouteError::Unroutable {
                        known: cond.labels().into_iter().map(str::to_string).collect(),
                        label,
                    }),
                }
            }
            None => Err(RouteError::NoEdge),
        }
    }
}
