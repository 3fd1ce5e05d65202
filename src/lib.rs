//! # stepgraph: state-graph workflow engine
//!
//! Workflows are directed graphs of async step functions over a shared,
//! schema-described [`State`](state::State).
//!
//! - **Schema**: every state field is declared with a kind and a reducer
//!   ([`reducers::ReducerType`]) that folds node updates into the state.
//! - **Nodes**: implement [`node::Node`] or wrap a function with
//!   [`node::node_fn`]; a node returns a [`node::NodePartial`] with only the
//!   fields it changes.
//! - **Graph**: [`graphs::GraphBuilder`] registers nodes, fixed edges and
//!   conditional edges; `compile` validates the whole graph at once and yields
//!   an immutable [`app::App`].
//! - **Runs**: [`app::App::invoke`] walks from the entry point to `End`, one
//!   node per step. Each step merges the node's update, then picks the next
//!   node from the merged state.
//!
//! ```
//! use stepgraph::graphs::GraphBuilder;
//! use stepgraph::message::Message;
//! use stepgraph::node::{node_fn, NodePartial};
//! use stepgraph::state::{State, StateSchema};
//! use stepgraph::types::NodeKind;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> miette::Result<()> {
//! let app = GraphBuilder::new(StateSchema::new().append("messages"))
//!     .add_node(
//!         "greet",
//!         node_fn(|_: &State| {
//!             Ok(NodePartial::new().with_messages("messages", [Message::assistant("hi")]))
//!         }),
//!     )?
//!     .set_entry_point("greet")?
//!     .add_edge("greet", NodeKind::End)?
//!     .compile()?;
//!
//! let state = app.invoke(State::new()).await?;
//! assert_eq!(state.last_message("messages").map(|m| m.content), Some("hi".into()));
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod demos;
pub mod graphs;
pub mod message;
pub mod node;
pub mod reducers;
pub mod runtimes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;

pub use app::App;
pub use graphs::{GraphBuilder, GraphError};
pub use node::{Node, NodeContext, NodeError, NodePartial, node_fn};
pub use runtimes::{Execution, RunnerError, RuntimeConfig};
pub use state::{State, StateSchema};
pub use types::NodeKind;
