//! Error types for Knowtrace

use thiserror::Error;

/// Result type alias using Knowtrace's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Knowtrace error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Graph store errors (E001-E099)
    #[error("Graph file '{path}' could not be loaded: {message}")]
    GraphLoad { path: String, message: String },

    #[error("Node '{0}' not found in the graph store.")]
    NodeNotFound(String),

    // Backend errors (E100-E199)
    #[error("Network error: {0}. Check the backend URI and your connection.")]
    Network(#[from] reqwest::Error),

    #[error("Remote backend error: {0}")]
    Backend(String),

    #[error("Remote backend is not connected; running in local-only mode.")]
    BackendOffline,

    // Telemetry errors (E200-E299)
    #[error("Interaction log '{path}' is not valid JSON: {message}")]
    LogParse { path: String, message: String },

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    Config(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::GraphLoad { .. } => "E001",
            Self::NodeNotFound(_) => "E002",
            Self::Network(_) => "E100",
            Self::Backend(_) => "E101",
            Self::BackendOffline => "E102",
            Self::LogParse { .. } => "E200",
            Self::Config(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::GraphLoad { .. } => {
                Some("Check `knowtrace config get graph.file` or scaffold one with `knowtrace init`".to_string())
            }
            Self::Network(_) | Self::BackendOffline => Some("knowtrace doctor".to_string()),
            Self::Config(_) => Some("knowtrace config list".to_string()),
            _ => None,
        }
    }
}
