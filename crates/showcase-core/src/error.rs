//! Error types for showcase-core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Invalid input at `{path}`: {message}")]
    InvalidInput { path: String, message: String },

    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    #[error("Too many pending client requests for session {0}")]
    BrokerBusy(String),

    #[error("Notification channel closed for session {0}")]
    OutboxClosed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CoreError {
    /// Build a validation error carrying the offending field path
    pub fn invalid_input(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            message: message.into(),
        }
    }
}
