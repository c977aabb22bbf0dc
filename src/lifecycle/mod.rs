//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown_signal() resolves → caller disconnects
//! ```

pub mod signals;

pub use signals::{shutdown_signal, ShutdownReason};
