use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::state::State;
use crate::types::NodeKind;

/// Decision function of a conditional edge, reduced to its string label.
pub type DecisionFn = Arc<dyn Fn(&State) -> String + Send + Sync>;

/// A closed set of branch labels.
///
/// Every value in [`BranchLabel::ALL`] must have a destination before a graph
/// using the label type can compile.
///
/// ```
/// use stepgraph::graphs::BranchLabel;
///
/// #[derive(Clone, Copy, PartialEq, Eq)]
/// enum Route {
///     Approve,
///     Reject,
/// }
///
/// impl BranchLabel for Route {
///     const ALL: &'static [Self] = &[Route::Approve, Route::Reject];
///
///     fn label(&self) -> &'static str {
///         match self {
///             Route::Approve => "approve",
///             Route::Reject => "reject",
///         }
///     }
/// }
/// ```
pub trait BranchLabel: Copy + Eq + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;
}

impl BranchLabel for bool {
    const ALL: &'static [Self] = &[true, false];

    fn label(&self) -> &'static str {
        if *self { "true" } else { "false" }
    }
}

/// Branching transition: a decision function plus its label-to-node mapping.
#[derive(Clone)]
pub struct ConditionalEdge {
    decide: DecisionFn,
    routes: FxHashMap<String, NodeKind>,
    /// Labels that must be mapped; `None` for dynamic label sets.
    required: Option<Vec<&'static str>>,
}

impl ConditionalEdge {
    pub(crate) fn typed<L: BranchLabel>(
        decide: impl Fn(&State) -> L + Send + Sync + 'static,
        routes: impl IntoIterator<Item = (L, NodeKind)>,
    ) -> Self {
        Self {
            decide: Arc::new(move |state| decide(state).label().to_string()),
            routes: routes
                .into_iter()
                .map(|(label, to)| (label.label().to_string(), to))
                .collect(),
            required: Some(L::ALL.iter().map(BranchLabel::label).collect()),
        }
    }

    pub(crate) fn dynamic(decide: DecisionFn, routes: FxHashMap<String, NodeKind>) -> Self {
        Self {
            decide,
            routes,
            required: None,
        }
    }

    /// Evaluates the decision function.
    pub fn decide(&self, state: &State) -> String {
        (self.decide)(state)
    }

    pub fn resolve(&self, label: &str) -> Option<&NodeKind> {
        self.routes.get(label)
    }

    /// Mapped labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// (label, destination) pairs sorted by label.
    pub fn routes(&self) -> Vec<(&str, &NodeKind)> {
        let mut routes: Vec<(&str, &NodeKind)> =
            self.routes.iter().map(|(l, to)| (l.as_str(), to)).collect();
        routes.sort_unstable_by(|a, b| a.0.cmp(b.0));
        routes
    }

    /// Labels of a closed label set that have no destination.
    pub fn unmapped_labels(&self) -> Vec<&'static str> {
        self.required
            .iter()
            .flatten()
            .filter(|label| !self.routes.contains_key(**label))
            .copied()
            .collect()
    }

    pub fn is_exhaustive_checked(&self) -> bool {
        self.required.is_some()
    }
}

impl fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("routes", &self.routes())
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// The single outgoing transition of a node.
#[derive(Clone, Debug)]
pub enum Edge {
    Fixed(NodeKind),
    Conditional(ConditionalEdge),
}

impl Edge {
    /// Every node this edge can lead to.
    pub fn targets(&self) -> Vec<&NodeKind> {
        match self {
            Edge::Fixed(to) => vec![to],
            Edge::Conditional(cond) => cond.routes().into_iter().map(|(_, to)| to).collect(),
        }
    }
}
