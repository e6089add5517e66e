/// Server setup and initialization
///
/// Wires together the forest registry and the HTTP routes.
/// Provides the main application factory function for creating the Axum app.

use crate::{
    api::{create_graph_routes, AppState},
    config::Config,
    workflow::registry::ForestRegistry,
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes
///
/// Starts from an empty forest; clients build it up through the editing
/// endpoints or load a whole workflow definition at once.
pub fn create_app(config: &Config) -> Result<Router> {
    tracing::info!("📁 Ensuring export directory exists: {}", config.export.export_dir);
    std::fs::create_dir_all(&config.export.export_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create export directory: {}", e))?;

    tracing::info!("📊 Initializing forest registry");
    let app_state = AppState {
        registry: Arc::new(ForestRegistry::default()),
        export_dir: PathBuf::from(&config.export.export_dir),
    };

    let app = Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Forest editing and analysis routes
        .merge(create_graph_routes().with_state(app_state));

    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting itemflow server...");

    let app = create_app(&config)?;

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
