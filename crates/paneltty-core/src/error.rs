//! Error types for `paneltty` core library.

use thiserror::Error;

/// Result type alias using `paneltty` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `paneltty` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed wire frame
    #[error("Failed to decode frame: {0}")]
    Frame(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Command history persistence error
    #[error("History store error: {0}")]
    History(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
