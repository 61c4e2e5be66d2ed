//! Error types for Tempo

use thiserror::Error;

/// Result type alias for Tempo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Tempo
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The upstream model call failed. The only error that aborts a step.
    #[error("Model invocation error: {0}")]
    ModelInvocation(String),

    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Invalid tool call: {0}")]
    InvalidToolCall(String),

    #[error("Tool '{name}' failed: {message}")]
    ToolExecution { name: String, message: String },

    #[error("Max iterations reached ({0})")]
    MaxIterations(usize),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::ToolExecution`] for the named tool.
    pub fn tool(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolExecution {
            name: name.into(),
            message: message.into(),
        }
    }
}
