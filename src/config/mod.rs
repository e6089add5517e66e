/// Configuration management for the itemflow service
///
/// Handles server binding and where exported graph documents are written.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Export configuration
    pub export: ExportConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Graph export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving GraphML exports (default: "exports")
    /// Creates: {node}.graphml per exported graph
    pub export_dir: String,
}

impl Config {
    /// Bind address in "host:port" form
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("ITEMFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("ITEMFLOW_PORT")
                    .unwrap_or_else(|_| "3004".to_string())
                    .parse()
                    .unwrap_or(3004),
            },
            export: ExportConfig {
                export_dir: std::env::var("ITEMFLOW_EXPORT_DIR")
                    .unwrap_or_else(|_| "exports".to_string()),
            },
        }
    }
}
