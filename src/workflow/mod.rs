/// Workflow Management Layer
///
/// This module keeps the workflow's graph structure correct while it is edited.
/// It provides:
/// - Type definitions (Workflow, Edge)
/// - The graph forest with automatic merge/split of graphs
/// - Cycle analysis and topological ordering
/// - GraphML export
/// - A shared registry publishing lock-free forest snapshots

// Core workflow type definitions
pub mod types;

// Disjoint graph forest with union/split
pub mod forest;

// Acyclicity, topological order, cycle breaking
pub mod cycles;

// GraphML export of a single DAG
pub mod graphml;

// Shared forest registry using ArcSwap snapshots
pub mod registry;

// Re-export commonly used types
pub use cycles::{OrderEntry, TopologicalOrder};
pub use forest::{Graph, GraphForest};
pub use registry::ForestRegistry;
pub use types::{Edge, Workflow};
