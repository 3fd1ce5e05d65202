use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a position in a workflow graph.
///
/// `Start` and `End` are virtual: they are never registered as nodes. `Start`
/// is only valid as an edge source (it names the entry point) and `End` only as
/// an edge destination (it terminates the run).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Start,
    End,
    Custom(String),
}

impl NodeKind {
    pub fn custom(name: impl Into<String>) -> Self {
        NodeKind::Custom(name.into())
    }

    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, NodeKind::Start)
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, NodeKind::End)
    }

    /// True for the two markers that cannot carry a step.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.is_start() || self.is_end()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Start => f.write_str("START"),
            NodeKind::End => f.write_str("END"),
            NodeKind::Custom(name) => f.write_str(name),
        }
    }
}

impl From<&str> for NodeKind {
    fn from(name: &str) -> Self {
        NodeKind::Custom(name.to_string())
    }
}

impl From<String> for NodeKind {
    fn from(name: String) -> Self {
        NodeKind::Custom(name)
    }
}

impl From<&NodeKind> for NodeKind {
    fn from(kind: &NodeKind) -> Self {
        kind.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_markers_and_bare_names() {
        assert_eq!(NodeKind::Start.to_string(), "START");
        assert_eq!(NodeKind::End.to_string(), "END");
        assert_eq!(NodeKind::from("process").to_string(), "process");
    }
}
