//! Error types for the core library

use thiserror::Error;

/// Core error type for buildd operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No signing key is valid for long enough
    #[error("No usable GPG key found")]
    KeyNotFound,

    /// The key listing could not be read
    #[error("Invalid key listing: {reason}")]
    InvalidKeyListing { reason: String },

    /// A take response is missing fields or carries malformed values
    #[error("Invalid take response: {reason}")]
    InvalidTakeResponse { reason: String },

    /// A version string could not be interpreted
    #[error("Invalid version {version}: {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Result type alias for buildd operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid take response error
    pub fn invalid_take_response(reason: impl Into<String>) -> Self {
        Self::InvalidTakeResponse { reason: reason.into() }
    }

    /// Create an invalid version error
    pub fn invalid_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion { version: version.into(), reason: reason.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }
}
