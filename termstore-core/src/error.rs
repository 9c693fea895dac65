//! Error types for termstore-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Branch or commit lifecycle errors
    #[error("Branch error: {0}")]
    Branch(String),

    /// A commit listener failed; the commit must be rolled back
    #[error("Commit hook error: {0}")]
    CommitHook(String),

    /// JSON parsing error (serde_json)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a branch error
    pub fn branch(msg: impl Into<String>) -> Self {
        Error::Branch(msg.into())
    }

    /// Create a commit hook error
    pub fn commit_hook(msg: impl Into<String>) -> Self {
        Error::CommitHook(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}
