/// Core workflow type definitions
///
/// A workflow is a set of named items and the connections between them.
/// Items carry no structural state of their own; everything item-specific
/// lives with the external item object keyed by the same name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A directed connection between two items
///
/// `src == dst` is a self-loop ("feedback"): it is kept so it can be
/// re-created and exported, but it never affects reachability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    /// Source item name
    pub src: String,
    /// Destination item name
    pub dst: String,
}

impl Edge {
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Whether this edge points back at its own source
    pub fn is_self_loop(&self) -> bool {
        self.src == self.dst
    }

    /// Whether the edge touches the given node at either end
    pub fn touches(&self, node: &str) -> bool {
        self.src == node || self.dst == node
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// A complete workflow definition as exchanged with editors and the API
///
/// Used to seed a forest in one go; the forest itself is the source of truth
/// for connectivity once loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier (e.g., "wf-etl")
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    /// Names of all items in the workflow
    pub items: Vec<String>,
    /// Connections between items
    #[serde(default)]
    pub connections: Vec<Edge>,
}
