use std::fmt;
use std::ops::Deref;

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::warn;

use super::builder::GraphBuilder;
use super::edges::Edge;
use crate::reducers::ReducerType;
use crate::types::NodeKind;

/// One structural problem found while compiling a graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    MissingEntryPoint,
    UnknownEntryPoint { node: String },
    UnknownEdgeTarget { from: String, to: String },
    UnknownBranchTarget { from: String, label: String, to: String },
    UnmappedBranchLabel { from: String, label: String },
    UnknownEdgeSource { from: String },
    DanglingNode { node: String },
    UndeclaredField { node: String, field: String },
    IncoherentField { field: String, kind: &'static str, reducer: ReducerType },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingEntryPoint => f.write_str("no entry point set"),
            Violation::UnknownEntryPoint { node } => {
                write!(f, "entry point `{node}` is not a registered node")
            }
            Violation::UnknownEdgeTarget { from, to } => {
                write!(f, "edge `{from}` -> `{to}` targets an unregistered node")
            }
            Violation::UnknownBranchTarget { from, label, to } => write!(
                f,
                "branch `{label}` of `{from}` targets unregistered node `{to}`"
            ),
            Violation::UnmappedBranchLabel { from, label } => {
                write!(f, "branch label `{label}` of `{from}` has no destination")
            }
            Violation::UnknownEdgeSource { from } => {
                write!(f, "edge source `{from}` is not a registered node")
            }
            Violation::DanglingNode { node } => {
                write!(f, "node `{node}` has no outgoing edge (route it to END to stop)")
            }
            Violation::UndeclaredField { node, field } => {
                write!(f, "node `{node}` writes undeclared state field `{field}`")
            }
            Violation::IncoherentField {
                field,
                kind,
                reducer,
            } => write!(
                f,
                "state field `{field}` declares {reducer:?} on a {kind} value"
            ),
        }
    }
}

/// Ordered list of violations, rendered one per line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Deref for Violations {
    type Target = [Violation];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in &self.0 {
            write!(f, "\n  - {v}")?;
        }
        Ok(())
    }
}

/// Aggregated compile-time failure.
#[derive(Debug, Error, Diagnostic)]
#[error("graph failed {} integrity check(s):{violations}", .violations.len())]
#[diagnostic(
    code(stepgraph::graph::integrity),
    help("Register every referenced node, or route to NodeKind::End.")
)]
pub struct GraphIntegrityError {
    pub violations: Violations,
}

impl GraphIntegrityError {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        Self {
            violations: Violations(violations),
        }
    }

    /// True if any violation's rendering mentions `name`.
    pub fn mentions(&self, name: &str) -> bool {
        self.violations.iter().any(|v| v.to_string().contains(name))
    }
}

fn is_known(builder: &GraphBuilder, node: &NodeKind) -> bool {
    node.is_end() || builder.nodes.contains_key(node)
}

/// Runs every check and returns all violations in check order.
pub(super) fn validate(builder: &GraphBuilder) -> Vec<Violation> {
    let mut violations = Vec::new();

    // (a) entry point
    match &builder.entry {
        None => violations.push(Violation::MissingEntryPoint),
        Some(entry) if !builder.nodes.contains_key(entry) => {
            violations.push(Violation::UnknownEntryPoint {
                node: entry.to_string(),
            });
        }
        Some(_) => {}
    }

    // (b) fixed destinations
    for from in &builder.edge_order {
        if let Some(Edge::Fixed(to)) = builder.edges.get(from)
            && !is_known(builder, to)
        {
            violations.push(Violation::UnknownEdgeTarget {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
    }

    // (c) branch destinations, then closed label sets
    for from in &builder.edge_order {
        let Some(Edge::Conditional(cond)) = builder.edges.get(from) else {
            continue;
        };
        for (label, to) in cond.routes() {
            if !is_known(builder, to) {
                violations.push(Violation::UnknownBranchTarget {
                    from: from.to_string(),
                    label: label.to_string(),
                    to: to.to_string(),
                });
            }
        }
        for label in cond.unmapped_labels() {
            violations.push(Violation::UnmappedBranchLabel {
                from: from.to_string(),
                label: label.to_string(),
            });
        }
    }

    // (d) every node needs a way out, every edge needs a registered source
    for node in &builder.node_order {
        if !builder.edges.contains_key(node) {
            violations.push(Violation::DanglingNode {
                node: node.to_string(),
            });
        }
    }
    for from in &builder.edge_order {
        if !builder.nodes.contains_key(from) {
            violations.push(Violation::UnknownEdgeSource {
                from: from.to_string(),
            });
        }
    }

    // declared writes
    for kind in &builder.node_order {
        let Some(node) = builder.nodes.get(kind) else {
            continue;
        };
        for field in node.writes() {
            if !builder.schema.contains(field) {
                violations.push(Violation::UndeclaredField {
                    node: kind.to_string(),
                    field: (*field).to_string(),
                });
            }
        }
    }

    // schema fields whose reducer rejects their own kind
    for name in builder.schema.field_names() {
        if let Some(spec) = builder.schema.get(name)
            && !spec.is_coherent()
        {
            violations.push(Violation::IncoherentField {
                field: name.to_string(),
                kind: spec.kind.name(),
                reducer: spec.reducer,
            });
        }
    }

    if violations.is_empty() {
        warn_unreachable(builder);
    }
    violations
}

/// Logs registered nodes that no path from the entry point reaches.
fn warn_unreachable(builder: &GraphBuilder) {
    let Some(entry) = &builder.entry else {
        return;
    };
    let mut seen: FxHashSet<&NodeKind> = FxHashSet::default();
    let mut stack = vec![entry];
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        if let Some(edge) = builder.edges.get(node) {
            stack.extend(edge.targets().into_iter().filter(|t| !t.is_end()));
        }
    }
    for node in &builder.node_order {
        if !seen.contains(node) {
            warn!(node = %node, "node is unreachable from the entry point");
        }
    }
}
