//! Execution of compiled graphs.
//!
//! An [`Execution`] owns one run: the current state, the node that runs next
//! and the step counter. [`App::invoke`](crate::app::App::invoke) drives one to
//! completion; [`App::execution`](crate::app::App::execution) hands it out for
//! stepwise control.
//!
//! Each step runs a single node on a copy of the state, merges the node's
//! partial through the schema reducers (the barrier), then evaluates the
//! outgoing edge against the merged state. Runs stop at `End`, or fail with a
//! [`RunnerError`] on node failure, merge failure, an unmapped branch label,
//! the step limit, cancellation or the deadline in [`RuntimeConfig`].
//!
//! ```
//! # use stepgraph::utils::testing::linear_app;
//! # tokio_test_block(async {
//! let app = linear_app(&["a", "b"]);
//! let mut run = app.execution(app.initial_state()).unwrap();
//! let report = run.run_step().await.unwrap().unwrap();
//! assert_eq!(report.ran.to_string(), "a");
//! assert_eq!(report.next.to_string(), "b");
//! assert!(!report.completed);
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod runner;
mod runtime_config;

pub use runner::{CancelReason, Execution, RunnerError, StepReport};
pub use runtime_config::{DEFAULT_STEP_LIMIT, RuntimeConfig};

#[cfg(test)]
mod tests;
