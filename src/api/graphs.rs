/// Graph forest REST API endpoints
///
/// Editing operations (nodes, edges, whole workflows) go through the shared
/// registry one at a time; analysis endpoints (order, cycles, export) read the
/// latest published snapshot without blocking editors.

use crate::{
    error::ForestError,
    workflow::{
        cycles::{edges_causing_cycles, order_up_to_node, topological_order, TopologicalOrder},
        graphml::export_graphml,
        registry::ForestRegistry,
        types::{Edge, Workflow},
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{path::PathBuf, sync::Arc};
use uuid::Uuid;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Shared forest registry
    pub registry: Arc<ForestRegistry>,
    /// Directory receiving GraphML exports
    pub export_dir: PathBuf,
}

/// Response for mutation operations
#[derive(Debug, Serialize)]
pub struct ForestResponse {
    pub message: String,
    pub graph_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateNodeRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameNodeRequest {
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadWorkflowRequest {
    pub workflow: Workflow,
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    /// Restrict the order to this node and its ancestors
    pub up_to: Option<String>,
}

/// Map structural errors onto HTTP status codes
fn status_for(error: &ForestError) -> StatusCode {
    match error {
        ForestError::NodeNotFound(_) | ForestError::GraphNotFound { .. } => StatusCode::NOT_FOUND,
        ForestError::DuplicateName(_) | ForestError::NotADag => StatusCode::CONFLICT,
        ForestError::Invariant(_) | ForestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(action: &str, error: ForestError) -> StatusCode {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!("❌ Failed to {}: {}", action, error);
    } else {
        tracing::warn!("⚠️ Rejected {}: {}", action, error);
    }
    status
}

/// Keep exported file names to a safe character set
///
/// Names that had to be rewritten get a short suffix derived from the
/// original name, so two nodes never share an export file.
fn export_file_name(node: &str) -> String {
    let stem: String = node
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem == node {
        return format!("{}.graphml", stem);
    }
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, node.as_bytes()).simple().to_string();
    format!("{}-{}.graphml", stem, &digest[..8])
}

/// Create forest management routes
pub fn create_graph_routes() -> Router<AppState> {
    Router::new()
        .route("/api/graphs", get(list_graphs))
        .route("/api/nodes", post(add_node))
        .route("/api/nodes/{name}", put(rename_node).delete(remove_node))
        .route("/api/edges", post(add_edge).delete(remove_edge))
        .route("/api/graphs/{node}/order", get(graph_order))
        .route("/api/graphs/{node}/cycles", get(graph_cycles))
        .route("/api/graphs/{node}/export", post(export_graph))
        .route("/api/workflows", post(load_workflow))
}

/// List all graphs
///
/// GET /api/graphs
/// Returns: { "graphs": [{ "nodes": [...], "edges": [...] }, ...] }
async fn list_graphs(State(state): State<AppState>) -> Json<Value> {
    let graphs = state.registry.snapshot();
    Json(json!({ "graphs": *graphs }))
}

/// Add a node as a new singleton graph
///
/// POST /api/nodes
/// Body: { "name": "..." }
async fn add_node(
    State(state): State<AppState>,
    Json(payload): Json<CreateNodeRequest>,
) -> Result<Json<ForestResponse>, StatusCode> {
    if payload.name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let graph_count = state
        .registry
        .edit(|forest| {
            forest.add_singleton_graph(&payload.name)?;
            Ok(forest.len())
        })
        .await
        .map_err(|e| reject("add node", e))?;

    Ok(Json(ForestResponse {
        message: format!("Node '{}' added", payload.name),
        graph_count,
    }))
}

/// Rename a node
///
/// PUT /api/nodes/{name}
/// Body: { "new_name": "..." }
async fn rename_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<RenameNodeRequest>,
) -> Result<Json<ForestResponse>, StatusCode> {
    if payload.new_name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let graph_count = state
        .registry
        .edit(|forest| {
            forest.rename_node(&name, &payload.new_name)?;
            Ok(forest.len())
        })
        .await
        .map_err(|e| reject("rename node", e))?;

    Ok(Json(ForestResponse {
        message: format!("Node '{}' renamed to '{}'", name, payload.new_name),
        graph_count,
    }))
}

/// Remove a node and its edges
///
/// DELETE /api/nodes/{name}
async fn remove_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ForestResponse>, StatusCode> {
    let graph_count = state
        .registry
        .edit(|forest| {
            forest.remove_node(&name)?;
            Ok(forest.len())
        })
        .await
        .map_err(|e| reject("remove node", e))?;

    Ok(Json(ForestResponse {
        message: format!("Node '{}' removed", name),
        graph_count,
    }))
}

/// Connect two nodes
///
/// POST /api/edges
/// Body: { "src": "...", "dst": "..." }
async fn add_edge(
    State(state): State<AppState>,
    Json(edge): Json<Edge>,
) -> Result<Json<ForestResponse>, StatusCode> {
    let graph_count = state
        .registry
        .edit(|forest| {
            forest.add_edge(&edge.src, &edge.dst)?;
            Ok(forest.len())
        })
        .await
        .map_err(|e| reject("add edge", e))?;

    Ok(Json(ForestResponse {
        message: format!("Edge {} added", edge),
        graph_count,
    }))
}

/// Disconnect two nodes
///
/// DELETE /api/edges
/// Body: { "src": "...", "dst": "..." }
async fn remove_edge(
    State(state): State<AppState>,
    Json(edge): Json<Edge>,
) -> Result<Json<ForestResponse>, StatusCode> {
    let graph_count = state
        .registry
        .edit(|forest| {
            forest.remove_edge(&edge.src, &edge.dst)?;
            Ok(forest.len())
        })
        .await
        .map_err(|e| reject("remove edge", e))?;

    Ok(Json(ForestResponse {
        message: format!("Edge {} removed", edge),
        graph_count,
    }))
}

/// Topological order of the graph containing a node
///
/// GET /api/graphs/{node}/order[?up_to=target]
/// Returns: { "acyclic": bool, "order": [{ "node": "...", "successors": [...] }] }
async fn graph_order(
    State(state): State<AppState>,
    Path(node): Path<String>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Value>, StatusCode> {
    let graph = state
        .registry
        .graph_containing(&node)
        .map_err(|e| reject("compute order", e))?;

    let order: TopologicalOrder = match &query.up_to {
        Some(target) => order_up_to_node(&graph, target).map_err(|e| reject("compute order", e))?,
        None => topological_order(&graph),
    };

    Ok(Json(json!({
        "acyclic": !order.is_empty(),
        "order": order,
    })))
}

/// Suggest edges whose removal makes the graph acyclic
///
/// GET /api/graphs/{node}/cycles
async fn graph_cycles(
    State(state): State<AppState>,
    Path(node): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let graph = state
        .registry
        .graph_containing(&node)
        .map_err(|e| reject("find cycles", e))?;
    Ok(Json(json!({ "edges": edges_causing_cycles(&graph) })))
}

/// Export the graph containing a node as GraphML
///
/// POST /api/graphs/{node}/export
/// Returns: { "path": "exports/{node}.graphml" }
async fn export_graph(
    State(state): State<AppState>,
    Path(node): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let graph = state
        .registry
        .graph_containing(&node)
        .map_err(|e| reject("export graph", e))?;
    let path = state.export_dir.join(export_file_name(&node));

    // File I/O off the async workers.
    let target = path.clone();
    tokio::task::spawn_blocking(move || export_graphml(&graph, &target))
        .await
        .map_err(|e| {
            tracing::error!("❌ Export task panicked: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| reject("export graph", e))?;

    Ok(Json(json!({ "path": path.display().to_string() })))
}

/// Replace the forest with a workflow definition
///
/// POST /api/workflows
/// Body: { "workflow": { "id": "...", "name": "...", "items": [...], "connections": [...] } }
async fn load_workflow(
    State(state): State<AppState>,
    Json(payload): Json<LoadWorkflowRequest>,
) -> Result<Json<ForestResponse>, StatusCode> {
    let workflow = payload.workflow;
    if workflow.id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let graph_count = state
        .registry
        .load_workflow(&workflow)
        .await
        .map_err(|e| reject("load workflow", e))?;

    Ok(Json(ForestResponse {
        message: format!("Workflow '{}' loaded", workflow.id),
        graph_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_names_are_sanitised() {
        assert_eq!(export_file_name("tool-1"), "tool-1.graphml");
        let rewritten = export_file_name("../etc/x y");
        assert!(rewritten.starts_with("___etc_x_y-"));
        assert!(rewritten.ends_with(".graphml"));
        assert!(!rewritten.contains('/'));
        assert_eq!(rewritten, export_file_name("../etc/x y"));
    }

    #[test]
    fn rewritten_names_do_not_collide() {
        assert_eq!(export_file_name("a_b"), "a_b.graphml");
        assert_ne!(export_file_name("a b"), export_file_name("a_b"));
        assert_ne!(export_file_name("a b"), export_file_name("a.b"));
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(status_for(&ForestError::NodeNotFound("a".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&ForestError::DuplicateName("a".into())), StatusCode::CONFLICT);
        assert_eq!(status_for(&ForestError::NotADag), StatusCode::CONFLICT);
    }
}
