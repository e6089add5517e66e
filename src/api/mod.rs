/// HTTP API Layer
///
/// This module provides the REST API endpoints for editing and inspecting
/// the workflow's graph forest. It handles:
/// - Node and edge mutation with automatic graph merge/split
/// - Topological order and cycle-breaking suggestions
/// - GraphML export of acyclic graphs

// Graph forest endpoints
pub mod graphs;

// Re-export router builder and state
pub use graphs::{create_graph_routes, AppState};
