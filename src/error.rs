//! char-knowledge error types

use thiserror::Error;

/// char-knowledge error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed import payload or a rejected manual edit
    #[error("Validation error: {0}")]
    Validation(String),

    /// Extraction rule error (invalid pattern)
    #[error("Rule error: {0}")]
    Rule(String),

    /// Memory store error
    #[error("Store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for char-knowledge operations
pub type Result<T> = std::result::Result<T, Error>;
