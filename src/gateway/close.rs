//! Close code classification.

/// Normal, caller-requested close.
pub const NORMAL: u16 = 1000;
/// Socket dropped without a close frame.
pub const ABNORMAL: u16 = 1006;
/// Close sent by us when we intend to resume.
pub const RESUMABLE: u16 = 4000;
/// Credential rejected by the platform.
pub const AUTHENTICATION_FAILED: u16 = 4004;

/// What the reconnection policy does with a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Fatal: surface an auth failure, clear the session, stay down.
    Halt,
    /// Normal close: stay down, keep the session.
    Stop,
    /// Transient: reconnect after the fixed delay.
    Reconnect,
}

pub fn classify(code: u16) -> CloseAction {
    match code {
        AUTHENTICATION_FAILED => CloseAction::Halt,
        NORMAL => CloseAction::Stop,
        _ => CloseAction::Reconnect,
    }
}
