//! Client error types.

use thiserror::Error;

/// Client error type.
///
/// Errors are `Clone` so that a single refresh failure can be handed to
/// every request that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// No response reached the client.
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-auth error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from server.
        message: String,
    },

    /// The session has expired.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Still unauthorized after a session refresh; the request is not
    /// retried again.
    #[error("Unauthorized after session refresh: {0}")]
    AlreadyRetried(String),

    /// The session refresh itself failed; the session has been cleared.
    #[error("Session refresh failed: {0}")]
    RefreshFailed(#[source] Box<Error>),

    /// The operation was abandoned before it produced an outcome.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The server reported an application-level failure in a 2xx response.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is a session (401) error, before or after a refresh.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Unauthorized(_) | Error::AlreadyRetried(_))
    }

    /// Check if the session could not be restored.
    pub fn is_refresh_failure(&self) -> bool {
        matches!(self, Error::RefreshFailed(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }

    /// Check if no response was received.
    pub fn is_network_error(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Json(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by the server.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    pub message: String,
}
