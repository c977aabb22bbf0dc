//! OS signal handling.

use std::fmt;

use tokio::signal;

/// Which signal ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    CtrlC,
    SigTerm,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::CtrlC => f.write_str("SIGINT"),
            ShutdownReason::SigTerm => f.write_str("SIGTERM"),
        }
    }
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
///
/// A handler that fails to register never resolves, so the other one
/// still ends the wait.
pub async fn shutdown_signal() -> ShutdownReason {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => ShutdownReason::CtrlC,
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                ShutdownReason::SigTerm
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<ShutdownReason>();

    let reason = tokio::select! {
        reason = ctrl_c => reason,
        reason = terminate => reason,
    };
    tracing::info!(signal = %reason, "Shutdown signal received");
    reason
}
