//! Session state and identity.
//!
//! # States
//! ```text
//! Disconnected → Connecting → AwaitingHandshake → Authenticating → Connected
//!       ▲                                                             │
//!       └──────────────── close / error (maybe reconnect) ◀──────────┘
//! Closing: entered by disconnect(), terminal for that connection
//! ```

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum SessionState {
    Disconnected = 0,
    Connecting = 1,
    AwaitingHandshake = 2,
    Authenticating = 3,
    Connected = 4,
    Closing = 5,
}

impl SessionState {
    /// True while a socket is open or being opened.
    pub fn is_live(self) -> bool {
        !matches!(self, SessionState::Disconnected | SessionState::Closing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingHandshake => "awaiting_handshake",
            SessionState::Authenticating => "authenticating",
            SessionState::Connected => "connected",
            SessionState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Continuity data that lets a dropped connection resume.
///
/// Owned by the session task; survives transient reconnects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionIdentity {
    pub session_id: Option<String>,
    pub resume_url: Option<String>,
    pub sequence: Option<u64>,
}

impl SessionIdentity {
    /// Resume is possible iff the platform has handed us a session id.
    pub fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    /// Record a frame sequence. Last write wins.
    pub fn observe_sequence(&mut self, sequence: Option<u64>) {
        if let Some(seq) = sequence {
            self.sequence = Some(seq);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Read-only view published after every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub sequence: Option<u64>,
    pub session_id: Option<String>,
    pub resume_url: Option<String>,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_acked: bool,
    /// Set once the credential has been rejected.
    pub halted: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Disconnected,
            sequence: None,
            session_id: None,
            resume_url: None,
            heartbeat_interval_ms: 0,
            heartbeat_acked: true,
            halted: false,
        }
    }
}
