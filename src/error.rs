/// Structural errors raised by the graph forest and cycle analysis
///
/// These are caller bugs (referencing something that does not exist, or
/// reusing a name) and are always surfaced, never swallowed. A cyclic graph
/// is NOT an error for ordering queries; it only becomes one when the caller
/// asks for something that requires a DAG (export, execution).

use thiserror::Error;

/// Convenience alias used throughout the workflow layer
pub type ForestResult<T> = std::result::Result<T, ForestError>;

#[derive(Debug, Error)]
pub enum ForestError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node name already in use: {0}")]
    DuplicateName(String),

    #[error("No graph contains edge {src} -> {dst}")]
    GraphNotFound { src: String, dst: String },

    #[error("Graph contains cycles - must be a DAG")]
    NotADag,

    #[error("Forest invariant violated: {0}")]
    Invariant(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
