//! HTTP error types

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T, E = HttpError> = std::result::Result<T, E>;

/// Errors produced while parsing a URI
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The string does not match the URI grammar
    #[error("Uri didn't match expected pattern: {0}")]
    InvalidUri(String),
    /// A scheme and a path are present but no host.
    ///
    /// Such URIs (`file:///etc/hosts`) are valid in general but are
    /// rejected here on purpose.
    #[error("Uri has a scheme and a path but no host: {0}")]
    OpaqueUri(String),
    /// The port does not fit in 16 bits
    #[error("Invalid port in uri: {0}")]
    InvalidPort(String),
}

/// HTTP errors that can occur while building requests or handling responses
#[derive(Debug, Error)]
pub enum HttpError {
    /// Uri parse error
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A segment token was set that does not appear in the resolved url
    #[error("Segment {segment} is not defined in Uri")]
    Template {
        /// The segment name, without braces
        segment: String,
    },
    /// The operation is not valid for the current builder state
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// The builder holds conflicting configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A header name or value cannot be sent on the wire
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// Request body serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Response content does not match the expected type
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    /// HTTP error with status code
    #[error("HTTP error ({status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),
    /// The transport gave up waiting for the server
    #[error("Request timeout")]
    Timeout,
    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::Deserialization(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for HttpError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        HttpError::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for HttpError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        HttpError::InvalidHeader(err.to_string())
    }
}
