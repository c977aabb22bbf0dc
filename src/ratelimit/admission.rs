//! Admission control for outbound calls.
//!
//! # Responsibilities
//! - Enforce the concurrency cap via a semaphore
//! - Charge one unit of `RateBudget` per admitted call
//! - Keep an optional minimum spacing between call starts
//! - Never admit more than `capacity` calls in any rolling refill interval
//! - Admit waiters strictly first-in, first-out
//!
//! # Design Decisions
//! - A fair async mutex is the queue: whoever holds it is the head waiter
//! - The last `capacity` admission instants are kept in a ring; the head
//!   waiter sleeps until the oldest one leaves the window
//! - The budget unit is taken last, so a cancelled waiter never loses one
//! - The concurrency slot is an RAII guard released when the call ends

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::ratelimit::budget::RateBudget;

/// FIFO gate combining the concurrency cap and the rate budget.
#[derive(Debug)]
pub struct AdmissionGate {
    /// Held by the head of the queue.
    queue: Mutex<History>,
    /// Concurrency slots.
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    budget: RateBudget,
    min_spacing: Duration,
}

/// Recent admission instants, oldest first, at most `capacity` long.
#[derive(Debug, Default)]
struct History {
    starts: VecDeque<Instant>,
}

impl History {
    /// Earliest instant a new admission keeps every rolling `window` at or
    /// under `capacity`.
    fn window_opens(&self, capacity: usize, window: Duration) -> Option<Instant> {
        if self.starts.len() < capacity {
            return None;
        }
        self.starts.front().map(|oldest| *oldest + window)
    }

    fn record(&mut self, at: Instant, capacity: usize) {
        self.starts.push_back(at);
        while self.starts.len() > capacity {
            self.starts.pop_front();
        }
    }
}

/// Proof of admission. Dropping it frees the concurrency slot.
#[derive(Debug)]
pub struct Admission {
    _slot: OwnedSemaphorePermit,
}

impl AdmissionGate {
    pub fn new(budget: RateBudget, max_concurrent: usize, min_spacing: Duration) -> Self {
        Self {
            queue: Mutex::new(History::default()),
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            budget,
            min_spacing,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            RateBudget::from_config(config),
            config.max_concurrent,
            Duration::from_millis(config.min_spacing_ms),
        )
    }

    /// Wait for a turn, a free slot and one unit of budget.
    ///
    /// Dropping the returned future before it resolves releases the queue
    /// position and any slot it held, and consumes no budget.
    pub async fn admit(&self) -> Admission {
        let mut history = self.queue.lock().await;

        let slot = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("admission semaphore is never closed");

        if let Some(prev) = history.starts.back() {
            if !self.min_spacing.is_zero() {
                time::sleep_until(*prev + self.min_spacing).await;
            }
        }

        let capacity = self.budget.capacity() as usize;
        if let Some(opens) = history.window_opens(capacity, self.budget.refill_interval()) {
            time::sleep_until(opens).await;
        }

        self.budget.consume().await;
        history.record(Instant::now(), capacity);

        Admission { _slot: slot }
    }

    /// Calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.slots.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn budget(&self) -> &RateBudget {
        &self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn gate(capacity: u32, max_concurrent: usize) -> Arc<AdmissionGate> {
        Arc::new(AdmissionGate::new(
            RateBudget::new(capacity, capacity, Duration::from_millis(1000)),
            max_concurrent,
            Duration::ZERO,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap() {
        let gate = gate(10, 2);
        let a = gate.admit().await;
        let _b = gate.admit().await;
        assert_eq!(gate.in_flight(), 2);

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _admission = gate.admit().await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(a);
        waiter.await.unwrap();
        assert_eq!(gate.budget().remaining(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_admitted_in_order() {
        let gate = gate(1, 1);
        let held = gate.admit().await;
        let order = Arc::new(StdMutex::new(Vec::new()));

        let mut tasks = Vec::new();
        for i in 0..5 {
            let gate = gate.clone();
            let order = order.clone();
            tasks.push(tokio::spawn(async move {
                let _admission = gate.admit().await;
                order.lock().unwrap().push(i);
            }));
            tokio::task::yield_now().await;
        }

        drop(held);
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_releases_everything() {
        let gate = gate(5, 1);
        let held = gate.admit().await;

        let cancelled = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _admission = gate.admit().await;
            })
        };
        tokio::task::yield_now().await;
        cancelled.abort();
        let _ = cancelled.await;

        drop(held);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.budget().remaining(), 4);

        let _next = gate.admit().await;
        assert_eq!(gate.in_flight(), 1);
        assert_eq!(gate.budget().remaining(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_spacing_between_starts() {
        let gate = AdmissionGate::new(
            RateBudget::new(10, 10, Duration::from_secs(1)),
            10,
            Duration::from_millis(20),
        );
        let start = Instant::now();
        let _a = gate.admit().await;
        let _b = gate.admit().await;
        let _c = gate.admit().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_across_refill_boundary_stays_in_window() {
        let gate = AdmissionGate::new(
            RateBudget::new(50, 50, Duration::from_millis(1000)),
            200,
            Duration::ZERO,
        );
        time::sleep(Duration::from_millis(990)).await;

        let mut starts = Vec::new();
        for _ in 0..100 {
            let _admission = gate.admit().await;
            starts.push(Instant::now());
        }

        for pair in starts.windows(51) {
            assert!(pair[50] - pair[0] >= Duration::from_millis(1000));
        }
        assert!(starts[99] - starts[0] >= Duration::from_millis(1000));
    }
}
