//! Consumer-facing notifications.
//!
//! Observers implement only the capabilities they care about; every method
//! has a no-op default. Callbacks run on the session task, so they must not
//! block. `ChannelObserver` hands everything to a queue instead.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::gateway::error::GatewayError;
use crate::gateway::state::SessionState;

/// A dispatch frame, forwarded verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub name: String,
    pub sequence: Option<u64>,
    pub data: Value,
}

pub trait GatewayObserver: Send + Sync + 'static {
    fn on_state_change(&self, _from: SessionState, _to: SessionState) {}

    fn on_dispatch(&self, _dispatch: &Dispatch) {}

    /// Transport errors (non-fatal) and `Auth` (fatal, reported once).
    fn on_error(&self, _error: &GatewayError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl GatewayObserver for NoopObserver {}

/// Everything an observer can see, as one value.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    StateChanged { from: SessionState, to: SessionState },
    Dispatch(Dispatch),
    Error(GatewayError),
}

/// Forwards every notification into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: GatewayEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl GatewayObserver for ChannelObserver {
    fn on_state_change(&self, from: SessionState, to: SessionState) {
        self.send(GatewayEvent::StateChanged { from, to });
    }

    fn on_dispatch(&self, dispatch: &Dispatch) {
        self.send(GatewayEvent::Dispatch(dispatch.clone()));
    }

    fn on_error(&self, error: &GatewayError) {
        self.send(GatewayEvent::Error(error.clone()));
    }
}
