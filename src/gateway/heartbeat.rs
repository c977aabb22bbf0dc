//! Heartbeat bookkeeping for one connection.
//!
//! # State Transitions
//! ```text
//! tick, acked     → send HEARTBEAT, acked = false
//! tick, not acked → zombie connection: close and reconnect
//! HEARTBEAT_ACK   → acked = true (only if a heartbeat was outstanding)
//! ```
//!
//! A fresh `Heartbeat` is built on every HELLO and dropped with the
//! connection, so no timer outlives its socket.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Result of a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send a heartbeat now.
    Send,
    /// The previous heartbeat was never acknowledged.
    Zombie,
}

#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    ticker: Interval,
    acked: bool,
    last_sent: Option<Instant>,
    last_latency: Option<Duration>,
}

impl Heartbeat {
    /// Start a heartbeat whose first tick is one full interval from now.
    pub fn start(interval: Duration) -> Self {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            ticker,
            acked: true,
            last_sent: None,
            last_latency: None,
        }
    }

    /// Wait for the next tick.
    pub async fn tick(&mut self) {
        self.ticker.tick().await;
    }

    /// Decide what a tick means given the ack state.
    pub fn on_tick(&mut self) -> HeartbeatAction {
        if !self.acked {
            return HeartbeatAction::Zombie;
        }
        self.mark_sent();
        HeartbeatAction::Send
    }

    /// Server asked for a heartbeat. Returns false when one is already
    /// outstanding, so two are never in flight.
    pub fn on_request(&mut self) -> bool {
        if !self.acked {
            return false;
        }
        self.mark_sent();
        true
    }

    /// Record an acknowledgement. Returns the round trip when it cleared an
    /// outstanding heartbeat, `None` for a stray ack.
    pub fn on_ack(&mut self) -> Option<Duration> {
        if self.acked {
            return None;
        }
        self.acked = true;
        let latency = self.last_sent.map(|sent| sent.elapsed());
        self.last_latency = latency;
        latency
    }

    fn mark_sent(&mut self) {
        self.acked = false;
        self.last_sent = Some(Instant::now());
    }

    pub fn acked(&self) -> bool {
        self.acked
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_latency(&self) -> Option<Duration> {
        self.last_latency
    }
}
