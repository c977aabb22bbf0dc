//! REST error definitions.

use thiserror::Error;

/// Structured rejection from the platform (non-2xx with an error code).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code}, HTTP {status} on {method} {path})")]
pub struct ApiError {
    /// Platform error code.
    pub code: u64,
    /// HTTP status.
    pub status: u16,
    pub method: String,
    pub path: String,
    pub message: String,
}

/// Non-2xx response without a structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP Error {status} on {method} {path}")]
pub struct HttpError {
    pub status: u16,
    pub method: String,
    pub path: String,
}

/// Errors returned to a `submit` caller.
#[derive(Debug, Error)]
pub enum RestError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Http(#[from] HttpError),

    /// The request never produced a response (connect, timeout, TLS).
    #[error("Transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body did not match its declared content type.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl RestError {
    /// HTTP status when the platform answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Api(e) => Some(e.status),
            RestError::Http(e) => Some(e.status),
            _ => None,
        }
    }
}

/// Result type for REST operations.
pub type RestResult<T> = Result<T, RestError>;
