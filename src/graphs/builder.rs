use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{debug, info};

use super::compilation::{GraphIntegrityError, validate};
use super::edges::{BranchLabel, ConditionalEdge, Edge};
use crate::app::App;
use crate::node::Node;
use crate::runtimes::RuntimeConfig;
use crate::state::{State, StateSchema};
use crate::types::NodeKind;

/// Registration errors, reported as soon as the offending call is made.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum GraphBuildError {
    #[error("node `{node}` is already registered")]
    #[diagnostic(code(stepgraph::graph::duplicate_node))]
    DuplicateNode { node: String },

    #[error("`{from}` already has an outgoing edge")]
    #[diagnostic(
        code(stepgraph::graph::duplicate_edge),
        help("Express branching with one conditional edge and several labels.")
    )]
    DuplicateEdge { from: String },

    #[error("{node} cannot be used as {role}")]
    #[diagnostic(code(stepgraph::graph::reserved_node))]
    ReservedNode { node: NodeKind, role: &'static str },

    #[error("branch label `{label}` of `{from}` is mapped more than once")]
    #[diagnostic(
        code(stepgraph::graph::duplicate_branch_label),
        help("Give each label exactly one destination.")
    )]
    DuplicateBranchLabel { from: String, label: String },
}

/// Any failure between `GraphBuilder::new` and a compiled [`App`].
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] GraphBuildError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Integrity(#[from] GraphIntegrityError),
}

/// Builder for workflow graphs.
///
/// Every method consumes and returns the builder so calls chain with `?`.
pub struct GraphBuilder {
    pub(super) schema: StateSchema,
    pub(super) nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    /// Registration order, kept so diagnostics are stable.
    pub(super) node_order: Vec<NodeKind>,
    pub(super) edges: FxHashMap<NodeKind, Edge>,
    pub(super) edge_order: Vec<NodeKind>,
    pub(super) entry: Option<NodeKind>,
    runtime_config: RuntimeConfig,
}

impl fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("nodes", &self.node_order)
            .field("edges", &self.edges)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

impl GraphBuilder {
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema,
            nodes: FxHashMap::default(),
            node_order: Vec::new(),
            edges: FxHashMap::default(),
            edge_order: Vec::new(),
            entry: None,
            runtime_config: RuntimeConfig::default(),
        }
    }

    pub fn add_node(
        mut self,
        name: impl Into<NodeKind>,
        node: impl Node + 'static,
    ) -> Result<Self, GraphBuildError> {
        let kind = name.into();
        if kind.is_virtual() {
            return Err(GraphBuildError::ReservedNode {
                node: kind,
                role: "a registered node",
            });
        }
        if self.nodes.contains_key(&kind) {
            return Err(GraphBuildError::DuplicateNode {
                node: kind.to_string(),
            });
        }
        debug!(node = %kind, "registered node");
        self.nodes.insert(kind.clone(), Arc::new(node));
        self.node_order.push(kind);
        Ok(self)
    }

    /// Declares where execution begins. Same as `add_edge(NodeKind::Start, node)`.
    pub fn set_entry_point(self, node: impl Into<NodeKind>) -> Result<Self, GraphBuildError> {
        self.add_edge(NodeKind::Start, node)
    }

    /// Registers a fixed transition. An edge from `Start` sets the entry point.
    pub fn add_edge(
        mut self,
        from: impl Into<NodeKind>,
        to: impl Into<NodeKind>,
    ) -> Result<Self, GraphBuildError> {
        let from = from.into();
        let to = to.into();
        Self::check_destination(&to)?;
        if from.is_start() {
            if self.entry.is_some() {
                return Err(GraphBuildError::DuplicateEdge {
                    from: from.to_string(),
                });
            }
            if to.is_end() {
                return Err(GraphBuildError::ReservedNode {
                    node: to,
                    role: "the entry point",
                });
            }
            self.entry = Some(to);
            return Ok(self);
        }
        self.insert_edge(from, Edge::Fixed(to))
    }

    /// Registers a branching transition over a closed label set.
    ///
    /// The decision runs on the state produced by `from`'s own update. Every
    /// label in `L::ALL` must appear in `routes`, or compilation fails.
    pub fn add_conditional_edge<L: BranchLabel>(
        self,
        from: impl Into<NodeKind>,
        decide: impl Fn(&State) -> L + Send + Sync + 'static,
        routes: impl IntoIterator<Item = (L, NodeKind)>,
    ) -> Result<Self, GraphBuildError> {
        let from = from.into();
        let routes: Vec<(L, NodeKind)> = routes.into_iter().collect();
        Self::check_routes(&from, routes.iter().map(|(l, to)| (l.label(), to)))?;
        self.insert_conditional(from, ConditionalEdge::typed(decide, routes))
    }

    /// Registers a branching transition whose labels are only known at run time.
    ///
    /// A label with no entry in `routes` aborts the run with
    /// [`RunnerError::UnroutableBranch`](crate::runtimes::RunnerError::UnroutableBranch).
    pub fn add_dynamic_conditional_edge<S: Into<String>>(
        self,
        from: impl Into<NodeKind>,
        decide: impl Fn(&State) -> String + Send + Sync + 'static,
        routes: impl IntoIterator<Item = (S, NodeKind)>,
    ) -> Result<Self, GraphBuildError> {
        let from = from.into();
        let routes: Vec<(String, NodeKind)> =
            routes.into_iter().map(|(l, to)| (l.into(), to)).collect();
        Self::check_routes(&from, routes.iter().map(|(l, to)| (l.as_str(), to)))?;
        self.insert_conditional(
            from,
            ConditionalEdge::dynamic(Arc::new(decide), routes.into_iter().collect()),
        )
    }

    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }

    /// Validates the graph and freezes it.
    ///
    /// All violations are collected before failing, so one error lists every
    /// problem in the graph.
    pub fn compile(mut self) -> Result<App, GraphIntegrityError> {
        let violations = validate(&self);
        match self.entry.take() {
            Some(entry) if violations.is_empty() => {
                info!(
                    entry = %entry,
                    nodes = self.nodes.len(),
                    edges = self.edges.len(),
                    "compiled graph"
                );
                Ok(App::from_parts(
                    self.schema,
                    self.nodes,
                    self.edges,
                    entry,
                    self.runtime_config,
                ))
            }
            // a missing entry point is itself a violation, so this list is never empty
            _ => Err(GraphIntegrityError::new(violations)),
        }
    }

    fn insert_conditional(
        self,
        from: NodeKind,
        edge: ConditionalEdge,
    ) -> Result<Self, GraphBuildError> {
        if from.is_start() {
            return Err(GraphBuildError::ReservedNode {
                node: from,
                role: "a conditional edge source",
            });
        }
        self.insert_edge(from, Edge::Conditional(edge))
    }

    fn insert_edge(mut self, from: NodeKind, edge: Edge) -> Result<Self, GraphBuildError> {
        if from.is_end() {
            return Err(GraphBuildError::ReservedNode {
                node: from,
                role: "an edge source",
            });
        }
        if self.edges.contains_key(&from) {
            return Err(GraphBuildError::DuplicateEdge {
                from: from.to_string(),
            });
        }
        debug!(from = %from, targets = ?edge.targets(), "registered edge");
        self.edges.insert(from.clone(), edge);
        self.edge_order.push(from);
        Ok(self)
    }

    /// Each label maps to one destination, and no destination is `Start`.
    fn check_routes<'r>(
        from: &NodeKind,
        routes: impl IntoIterator<Item = (&'r str, &'r NodeKind)>,
    ) -> Result<(), GraphBuildError> {
        let mut seen = FxHashSet::default();
        for (label, to) in routes {
            Self::check_destination(to)?;
            if !seen.insert(label) {
                return Err(GraphBuildError::DuplicateBranchLabel {
                    from: from.to_string(),
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_destination(to: &NodeKind) -> Result<(), GraphBuildError> {
        if to.is_start() {
            return Err(GraphBuildError::ReservedNode {
                node: to.clone(),
                role: "an edge destination",
            });
        }
        Ok(())
    }
}
