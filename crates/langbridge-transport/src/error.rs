//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in transport operations.
///
/// Callers only ever observe configuration problems and a single connection
/// failure kind. HTTP error statuses (4xx/5xx) are not errors here; they come
/// back as ordinary responses.
#[derive(Debug, Error)]
pub enum Error {
    /// Proxy or TLS configuration has an unusable shape or value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The request descriptor cannot be turned into a prepared request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Transport-level failure while executing a request.
    #[error("Connection error: {message}")]
    Connection {
        /// Human-readable description of the failure
        message: String,
        /// Whether the failure class is safe to retry
        should_retry: bool,
    },
}

impl Error {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>, should_retry: bool) -> Self {
        Self::Connection {
            message: message.into(),
            should_retry,
        }
    }

    /// Advisory retry flag for a caller-side retry policy.
    ///
    /// Only timeouts and low-level connection failures are retry-eligible.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { should_retry, .. } => *should_retry,
            Self::InvalidConfig(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
