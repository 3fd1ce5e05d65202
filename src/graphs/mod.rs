//! Graph definition and compilation.
//!
//! [`GraphBuilder`] collects nodes and edges against a
//! [`StateSchema`](crate::state::StateSchema); [`GraphBuilder::compile`] runs the
//! integrity checks and freezes everything into an [`App`](crate::app::App).
//!
//! - Registration errors (duplicate node, second outgoing edge, repeated branch
//!   label, misuse of the `Start`/`End` markers) are reported immediately as
//!   [`GraphBuildError`].
//! - Structural problems (unknown destinations, dangling nodes, unmapped branch
//!   labels, undeclared writes, reducers that cannot take their field's kind)
//!   are collected by the validator and reported together as one
//!   [`GraphIntegrityError`].
//!
//! # Conditional routing
//!
//! Branch decisions are closed label sets: implement [`BranchLabel`] for an enum
//! (it is already implemented for `bool`) and every variant must be mapped before
//! the graph compiles. Labels that are only known at run time go through
//! [`GraphBuilder::add_dynamic_conditional_edge`]; an unmapped label there fails
//! the run with [`RunnerError::UnroutableBranch`](crate::runtimes::RunnerError::UnroutableBranch).
//!
//! ```
//! use stepgraph::graphs::GraphBuilder;
//! use stepgraph::node::{node_fn, NodePartial};
//! use stepgraph::state::{FieldKind, State, StateSchema};
//! use stepgraph::types::NodeKind;
//!
//! let schema = StateSchema::new().replace("flag", FieldKind::Bool);
//! let app = GraphBuilder::new(schema)
//!     .add_node("check", node_fn(|_: &State| Ok(NodePartial::new().with("flag", true))))?
//!     .add_node("yes", node_fn(|_: &State| Ok(NodePartial::new())))?
//!     .add_node("no", node_fn(|_: &State| Ok(NodePartial::new())))?
//!     .set_entry_point("check")?
//!     .add_conditional_edge(
//!         "check",
//!         |s: &State| s.get_bool("flag").unwrap_or(false),
//!         [(true, NodeKind::from("yes")), (false, NodeKind::from("no"))],
//!     )?
//!     .add_edge("yes", NodeKind::End)?
//!     .add_edge("no", NodeKind::End)?
//!     .compile()?;
//! assert_eq!(app.entry_point(), &NodeKind::from("check"));
//! # Ok::<(), stepgraph::graphs::GraphError>(())
//! ```

mod builder;
mod compilation;
mod edges;

pub use builder::{GraphBuildError, GraphBuilder, GraphError};
pub use compilation::{GraphIntegrityError, Violation, Violations};
pub use edges::{BranchLabel, ConditionalEdge, DecisionFn, Edge};
