//! Error types for dispatching.

use thiserror::Error;

/// Errors raised while registering routes or dispatching a request.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Invalid path pattern.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(String),

    /// A path pattern names the same parameter twice.
    #[error("duplicate parameter `{name}` in pattern {pattern}")]
    DuplicateParam { pattern: String, name: String },

    /// Unsupported HTTP method.
    #[error("unknown HTTP method: {0}")]
    UnknownMethod(String),

    /// Invalid server options.
    #[error("invalid server options: {0}")]
    Config(String),

    /// The request body could not be decoded as JSON.
    #[error("failed to decode JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The request body could not be decoded.
    #[error("failed to decode request body: {0}")]
    InvalidBody(String),

    /// A handler or middleware reported a failure.
    #[error("handler failed: {0}")]
    Handler(String),

    /// A handler or middleware panicked.
    #[error("handler panicked: {0}")]
    Panic(String),

    /// Any other error raised by application code.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RouterError {
    /// Creates a handler failure from a message.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, RouterError>;
