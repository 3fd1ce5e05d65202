use std::fmt;
use std::time::Instant;

use miette::Diagnostic;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::app::{App, RouteError};
use crate::node::{NodeContext, NodeError};
use crate::state::{State, StateError};
use crate::types::NodeKind;

/// What a single call to [`Execution::run_step`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step: u64,
    pub ran: NodeKind,
    /// Fields whose value changed when the node's partial was merged.
    pub updated_fields: Vec<String>,
    pub next: NodeKind,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Requested,
    DeadlineElapsed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => f.write_str("cancellation requested"),
            CancelReason::DeadlineElapsed => f.write_str("deadline elapsed"),
        }
    }
}

/// Run-time failures. Each aborts the current run; variants raised after the
/// run started carry the last consistent state for diagnosis.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("initial state rejected: {source}")]
    #[diagnostic(code(stepgraph::runner::initial_state))]
    InvalidInitialState {
        #[source]
        source: StateError,
    },

    #[error("node `{node}` failed at step {step}: {source}")]
    #[diagnostic(code(stepgraph::runner::node_execution))]
    NodeExecution {
        node: String,
        step: u64,
        #[source]
        source: NodeError,
        state: Box<State>,
    },

    #[error("update from node `{node}` at step {step} could not be merged: {source}")]
    #[diagnostic(code(stepgraph::runner::merge))]
    Merge {
        node: String,
        step: u64,
        #[source]
        source: StateError,
        state: Box<State>,
    },

    #[error("node `{node}` chose branch `{label}`, which has no destination (mapped: {known:?})")]
    #[diagnostic(
        code(stepgraph::runner::unroutable_branch),
        help("Map the label in the conditional edge, or make the decision function return a mapped label.")
    )]
    UnroutableBranch {
        node: String,
        label: String,
        known: Vec<String>,
        step: u64,
        state: Box<State>,
    },

    #[error("step limit of {limit} reached before running `{node}`")]
    #[diagnostic(
        code(stepgraph::runner::step_limit),
        help("The graph probably cycles; raise RuntimeConfig::step_limit if the loop is intended.")
    )]
    StepLimitExceeded {
        limit: u64,
        node: String,
        state: Box<State>,
    },

    #[error("run cancelled after {step} step(s): {reason}")]
    #[diagnostic(code(stepgraph::runner::cancelled))]
    Cancelled {
        reason: CancelReason,
        step: u64,
        state: Box<State>,
    },

    #[error("compiled graph has no {what} for `{node}`")]
    #[diagnostic(code(stepgraph::runner::inconsistent))]
    Inconsistent { node: String, what: &'static str },
}

impl RunnerError {
    /// The state the run had reached when it failed, when one exists.
    pub fn last_state(&self) -> Option<&State> {
        match self {
            RunnerError::NodeExecution { state, .. }
            | RunnerError::Merge { state, .. }
            | RunnerError::UnroutableBranch { state, .. }
            | RunnerError::StepLimitExceeded { state, .. }
            | RunnerError::Cancelled { state, .. } => Some(state),
            RunnerError::InvalidInitialState { .. } | RunnerError::Inconsistent { .. } => None,
        }
    }

    /// Name of the node involved in the failure, when one is.
    pub fn node(&self) -> Option<&str> {
        match self {
            RunnerError::NodeExecution { node, .. }
            | RunnerError::Merge { node, .. }
            | RunnerError::UnroutableBranch { node, .. }
            | RunnerError::StepLimitExceeded { node, .. }
            | RunnerError::Inconsistent { node, .. } => Some(node),
            RunnerError::InvalidInitialState { .. } | RunnerError::Cancelled { .. } => None,
        }
    }
}

/// One in-flight run of an [`App`].
///
/// Created by [`App::execution`]. Owns its state; the app is only borrowed.
/// Call [`Execution::run_step`] to advance one node at a time, or
/// [`Execution::run_until_complete`] to drive it to `End`.
pub struct Execution<'a> {
    app: &'a App,
    state: State,
    current: NodeKind,
    step: u64,
    run_id: String,
    started: Instant,
    cancel: CancellationToken,
}

impl<'a> Execution<'a> {
    pub(crate) fn new(app: &'a App, state: State) -> Self {
        Self {
            app,
            state,
            current: app.entry_point().clone(),
            step: 0,
            run_id: app.next_run_id(),
            started: Instant::now(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// The node that runs next, or `End` once the run is complete.
    pub fn current(&self) -> &NodeKind {
        &self.current
    }

    /// Number of nodes executed so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_end()
    }

    pub fn into_state(self) -> State {
        self.state
    }

    fn snapshot(&self) -> Box<State> {
        Box::new(self.state.clone())
    }

    fn check_interrupts(&self) -> Result<(), RunnerError> {
        let reason = if self.cancel.is_cancelled() {
            Some(CancelReason::Requested)
        } else if let Some(deadline) = self.app.runtime_config().deadline
            && self.started.elapsed() >= deadline
        {
            Some(CancelReason::DeadlineElapsed)
        } else {
            None
        };
        if let Some(reason) = reason {
            warn!(run_id = %self.run_id, step = self.step, %reason, "run cancelled");
            return Err(RunnerError::Cancelled {
                reason,
                step: self.step,
                state: self.snapshot(),
            });
        }
        let limit = self.app.runtime_config().step_limit;
        if self.step >= limit {
            warn!(run_id = %self.run_id, limit, node = %self.current, "step limit reached");
            return Err(RunnerError::StepLimitExceeded {
                limit,
                node: self.current.to_string(),
                state: self.snapshot(),
            });
        }
        Ok(())
    }

    /// Runs the current node, merges its partial and resolves the next node.
    ///
    /// Returns `Ok(None)` once the run has reached `End`. On error the
    /// execution is left at the failing node with the pre-step state.
    #[instrument(skip(self), fields(run_id = %self.run_id, node = %self.current))]
    pub async fn run_step(&mut self) -> Result<Option<StepReport>, RunnerError> {
        if self.is_complete() {
            return Ok(None);
        }
        self.check_interrupts()?;

        let node_name = self.current.to_string();
        let node = self
            .app
            .node(&self.current)
            .ok_or_else(|| RunnerError::Inconsistent {
                node: node_name.clone(),
                what: "registered node",
            })?
            .clone();

        let step = self.step + 1;
        let ctx = NodeContext {
            node_id: node_name.clone(),
            step,
            run_id: self.run_id.clone(),
        };
        let partial = node
            .run(self.state.clone(), ctx)
            .await
            .map_err(|source| RunnerError::NodeExecution {
                node: node_name.clone(),
                step,
                source,
                state: self.snapshot(),
            })?;

        let outcome = self
            .app
            .apply_barrier(&self.state, &self.current, &partial)
            .map_err(|source| RunnerError::Merge {
                node: node_name.clone(),
                step,
                source,
                state: self.snapshot(),
            })?;

        let next = match self.app.route(&self.current, &outcome.state) {
            Ok(next) => next,
            Err(RouteError::Unroutable { label, known }) => {
                warn!(node = %node_name, %label, "decision returned an unmapped label");
                return Err(RunnerError::UnroutableBranch {
                    node: node_name,
                    label,
                    known,
                    step,
                    state: Box::new(outcome.state),
                });
            }
            Err(RouteError::NoEdge) => {
                return Err(RunnerError::Inconsistent {
                    node: node_name,
                    what: "outgoing edge",
                });
            }
        };

        self.step = step;
        self.state = outcome.state;
        let ran = std::mem::replace(&mut self.current, next.clone());
        let completed = next.is_end();
        debug!(step, next = %next, updated = ?outcome.updated, "step complete");

        Ok(Some(StepReport {
            step,
            ran,
            updated_fields: outcome.updated,
            next,
            completed,
        }))
    }

    /// Drives the run to `End` and returns the final state.
    pub async fn run_until_complete(mut self) -> Result<State, RunnerError> {
        while self.run_step().await?.is_some() {}
        info!(run_id = %self.run_id, steps = self.step, "run complete");
        Ok(self.state)
    }
}
