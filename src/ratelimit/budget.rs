//! Shared request budget with fixed-interval refill.
//!
//! A token bucket whose tokens are semaphore permits. Admissions consume a
//! permit for good; one background task resets the available count to
//! `refill_amount` at every interval boundary. The count can never go
//! negative because a permit must exist before it is consumed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::RateLimitConfig;

/// A token bucket refilled by a single shared timer.
#[derive(Debug)]
pub struct RateBudget {
    permits: Arc<Semaphore>,
    capacity: u32,
    refill_amount: u32,
    refill_interval: Duration,
    epoch: Instant,
    refill_task: JoinHandle<()>,
}

impl RateBudget {
    /// Create a full budget and start its refill timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(capacity: u32, refill_amount: u32, refill_interval: Duration) -> Self {
        let permits = Arc::new(Semaphore::new(capacity as usize));
        let epoch = Instant::now();
        let target = refill_amount.min(capacity) as usize;

        let refill_task = tokio::spawn(run_refill(
            permits.clone(),
            target,
            epoch,
            refill_interval,
        ));

        tracing::debug!(
            capacity,
            refill_amount,
            refill_interval_ms = refill_interval.as_millis() as u64,
            "Rate budget created"
        );

        Self {
            permits,
            capacity,
            refill_amount,
            refill_interval,
            epoch,
            refill_task,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.capacity,
            config.refill_amount,
            Duration::from_millis(config.refill_interval_ms),
        )
    }

    /// Wait for one unit of budget and consume it.
    ///
    /// Cancel-safe: a caller dropped while waiting consumes nothing.
    pub async fn consume(&self) {
        let permit = self
            .permits
            .acquire()
            .await
            .expect("budget semaphore is never closed");
        permit.forget();
    }

    /// Consume one unit if available right now.
    pub fn try_consume(&self) -> bool {
        match self.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Units left in the current window.
    pub fn remaining(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_amount(&self) -> u32 {
        self.refill_amount
    }

    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Instant the refill boundaries are aligned to.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

impl Drop for RateBudget {
    fn drop(&mut self) {
        self.refill_task.abort();
    }
}

async fn run_refill(permits: Arc<Semaphore>, target: usize, epoch: Instant, interval: Duration) {
    let mut ticker = time::interval_at(epoch + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        reset_to(&permits, target);
    }
}

/// Replace the available count with `target`.
fn reset_to(permits: &Semaphore, target: usize) {
    let available = permits.available_permits();
    if available < target {
        permits.add_permits(target - available);
    } else if available > target {
        if let Ok(excess) = permits.try_acquire_many((available - target) as u32) {
            excess.forget();
        }
    }
    tracing::trace!(remaining = target, "Rate budget refilled");
}
