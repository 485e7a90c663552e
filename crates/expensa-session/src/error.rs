//! Error types for session persistence.

/// Error type for session persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing the session file failed.
    #[error("Session file error at '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The stored session could not be encoded or decoded.
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for session persistence operations.
pub type Result<T> = std::result::Result<T, Error>;
