//! Gateway error definitions.

use thiserror::Error;

/// Errors produced by the gateway session.
///
/// `Auth` is fatal and halts the session. `Transport` is absorbed by the
/// reconnection policy and only reported to observers, except when it is
/// the answer to an explicit `connect`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Credential rejected by the platform (close code 4004).
    #[error("Invalid token provided. The token is incorrect or has expired.")]
    Auth,

    /// Socket-level failure: connect, read, write or unexpected close.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A frame we could not make sense of.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// `connect` while a connection is live or being established.
    #[error("Session is already connected or connecting")]
    AlreadyConnected,

    /// The session was disconnected, or its task has stopped.
    #[error("Session closed")]
    Closed,
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
