//! Error types for cumulus-core

use thiserror::Error;

/// Core error types for the cumulus library
#[derive(Error, Debug)]
pub enum Error {
    /// The storage backend could not complete a call
    #[error("Backend unavailable while accessing '{context}': {message}")]
    BackendUnavailable {
        /// The prefix or key that was being accessed
        context: String,
        /// Message reported by the backend
        message: String,
    },

    /// Malformed glob pattern
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// What is wrong with it
        reason: String,
    },

    /// Requested child or key is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Two raw names in one group sanitize to the same identifier
    #[error("Name collision in group '{group}': '{first}' and '{second}' both sanitize to '{sanitized}'")]
    NameCollision {
        /// Path of the affected group
        group: String,
        /// Raw name registered first
        first: String,
        /// Raw name that collided with it
        second: String,
        /// The shared sanitized name
        sanitized: String,
    },

    /// Destination key is taken and overwriting was not requested
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `BackendUnavailable` error for the given prefix or key
    pub fn backend(context: impl Into<String>, message: impl ToString) -> Self {
        Error::BackendUnavailable {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is expected during interactive exploration
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
