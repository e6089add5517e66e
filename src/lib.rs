/// Itemflow: workflow graph-forest registry and item execution coordinator
///
/// This library keeps a workflow's item graphs correct while they are edited
/// (merging, splitting, cycle detection) and drives execution of one acyclic
/// graph at a time, passing produced resources downstream.

// Core configuration and setup
pub mod config;

// Structural error types
pub mod error;

// Workflow structure layer - graph forest, cycle analysis, export, registry
pub mod workflow;

// Runtime execution engine - sequential coordinator and resource propagation
pub mod runtime;

// HTTP API layer - REST endpoints for editing and inspecting the forest
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{ForestError, ForestResult};
pub use runtime::{ExecutionCoordinator, ExecutionEngine, ExecutionStatus, Item, RunStatus};
pub use server::start_server;
pub use workflow::{Edge, Graph, GraphForest, TopologicalOrder, Workflow};
