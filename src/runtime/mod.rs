/// Runtime Execution Engine
///
/// This module drives execution of one acyclic graph at a time.
/// It handles:
/// - The item execution contract (status, outcome, cancellation)
/// - Per-item resource visibility and propagation
/// - Sequential, completion-driven coordination of a topological order
/// - Engine glue that refuses cyclic graphs and runs independent graphs side by side

// Item execution contract
pub mod item;

// Resource visibility table
pub mod resources;

// Single-graph sequential coordinator
pub mod coordinator;

// Forest-level execution entry points
pub mod engine;

// Re-export main types
pub use coordinator::{CoordinatorHandle, CoordinatorState, ExecutionCoordinator, RunReport, RunStatus};
pub use engine::ExecutionEngine;
pub use item::{ExecutionStatus, Item, ItemContext, ItemOutcome};
pub use resources::{Resource, ResourceKind, ResourceSet, ResourceTable};
