//! Error types for build execution

use thiserror::Error;

/// Build-specific error types
#[derive(Error, Debug)]
pub enum BuildError {
    /// The daemon cannot operate with its current configuration
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// No upload target is configured for the job's archive
    #[error("Could not upload to {archive}: no upload target configured")]
    UnknownArchive { archive: String },

    /// An external tool exited unsuccessfully
    #[error("{tool} exited with {status}")]
    ToolFailed { tool: String, status: String },

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts ({max_attempts}) exceeded for operation: {operation}")]
    MaxRetriesExceeded {
        operation: String,
        max_attempts: u32,
        #[source]
        source: Box<BuildError>,
    },

    /// Queue error
    #[error("Queue error: {0}")]
    Queue(#[from] buildd_queue::QueueError),

    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] buildd_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for build operations
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration { reason: reason.into() }
    }

    /// Create a tool failure error
    pub fn tool_failed(tool: impl Into<String>, status: impl Into<String>) -> Self {
        Self::ToolFailed { tool: tool.into(), status: status.into() }
    }

    /// Check whether the daemon must stop and wait for an operator
    pub fn is_fatal_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
