use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use itemflow::config::{Config, ExportConfig, ServerConfig};
use itemflow::server::create_app;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(export_dir: &std::path::Path) -> Router {
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        export: ExportConfig {
            export_dir: export_dir.display().to_string(),
        },
    };
    create_app(&config).unwrap()
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_check_answers_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn editing_merges_and_splits_graphs() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    for name in ["a", "b", "c"] {
        let (status, _) = call(&app, Method::POST, "/api/nodes", Some(json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = call(&app, Method::POST, "/api/nodes", Some(json!({ "name": "a" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(&app, Method::POST, "/api/edges", Some(json!({ "src": "a", "dst": "b" }))).await;
    assert_eq!(body["graph_count"], 2);
    let (_, body) = call(&app, Method::POST, "/api/edges", Some(json!({ "src": "b", "dst": "c" }))).await;
    assert_eq!(body["graph_count"], 1);

    let (status, body) = call(&app, Method::GET, "/api/graphs/a/order", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["acyclic"], true);
    assert_eq!(body["order"][0]["node"], "a");
    assert_eq!(body["order"][0]["successors"], json!(["b"]));

    let (_, body) = call(&app, Method::GET, "/api/graphs/c/order?up_to=b", None).await;
    assert_eq!(body["order"].as_array().unwrap().len(), 2);

    let (_, body) = call(&app, Method::DELETE, "/api/edges", Some(json!({ "src": "a", "dst": "b" }))).await;
    assert_eq!(body["graph_count"], 2);

    let (status, _) = call(&app, Method::DELETE, "/api/edges", Some(json!({ "src": "a", "dst": "b" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::PUT, "/api/nodes/c", Some(json!({ "new_name": "d" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::DELETE, "/api/nodes/c", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, Method::GET, "/api/graphs", None).await;
    assert_eq!(body["graphs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn cyclic_workflow_reports_cycles_and_refuses_export() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let workflow = json!({
        "workflow": {
            "id": "wf-loop",
            "name": "Loop",
            "items": ["a", "b", "c"],
            "connections": [
                { "src": "a", "dst": "b" },
                { "src": "b", "dst": "c" },
                { "src": "c", "dst": "b" }
            ]
        }
    });
    let (status, body) = call(&app, Method::POST, "/api/workflows", Some(workflow)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["graph_count"], 1);

    let (_, body) = call(&app, Method::GET, "/api/graphs/a/order", None).await;
    assert_eq!(body["acyclic"], false);

    let (_, body) = call(&app, Method::GET, "/api/graphs/a/cycles", None).await;
    assert_eq!(body["edges"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, Method::POST, "/api/graphs/a/export", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, Method::DELETE, "/api/edges", Some(json!({ "src": "c", "dst": "b" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, Method::POST, "/api/graphs/a/export", None).await;
    assert_eq!(status, StatusCode::OK);
    let path = body["path"].as_str().unwrap();
    assert!(std::fs::read_to_string(path).unwrap().contains("<edge source=\"b\" target=\"c\"/>"));
}
