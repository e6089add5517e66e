/// Itemflow server
///
/// Main entry point. Initializes configuration and starts the HTTP server
/// exposing the graph forest editing and analysis API.

use itemflow::{config::Config, server::start_server};

/// Application entry point
///
/// Initializes the server with default configuration and starts listening for requests.
/// The server provides:
/// - Forest editing API at /api/nodes, /api/edges, /api/workflows
/// - Graph analysis at /api/graphs/{node}/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (defaults to 0.0.0.0:3004 and ./exports)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
