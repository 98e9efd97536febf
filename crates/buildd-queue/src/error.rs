//! Error types for queue communication

use thiserror::Error;

/// Queue-specific error types
#[derive(Error, Debug)]
pub enum QueueError {
    /// The remote call exited unsuccessfully
    #[error("Queue command {command} failed with {status}: {stderr}")]
    CommandFailed { command: String, status: String, stderr: String },

    /// The queue answered with something that cannot be interpreted
    #[error("Invalid queue response: {reason}")]
    InvalidResponse { reason: String },

    /// A pending-list entry is not of the form `arch/dist/package_version`
    #[error("Invalid job identifier: {identifier}")]
    InvalidIdentifier { identifier: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] buildd_core::Error),
}

/// Result type alias for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;

impl QueueError {
    /// Create an invalid response error
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse { reason: reason.into() }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(identifier: impl Into<String>) -> Self {
        Self::InvalidIdentifier { identifier: identifier.into() }
    }
}
