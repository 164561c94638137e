//! Countdown-based hard stop for a conversation session.

use super::event::EngineEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A single-shot countdown from a configured budget.
///
/// Decrements once per second while running. On reaching zero it posts
/// `BudgetExhausted` to the engine's event channel and stops itself; the
/// engine acts on the signal cooperatively, at its next playback-settled
/// evaluation. There is no pause — `cancel` ends the countdown outright, and
/// a countdown is never reused across sessions.
#[derive(Debug)]
pub struct Countdown {
    remaining: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl Countdown {
    /// Starts ticking down from `budget_secs`.
    pub fn start(
        budget_secs: u64,
        events: mpsc::UnboundedSender<EngineEvent>,
        epoch: u64,
    ) -> Self {
        let remaining = Arc::new(AtomicU64::new(budget_secs));
        let cancel = CancellationToken::new();

        let task_remaining = Arc::clone(&remaining);
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(Duration::from_secs(1));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; consume the zeroth tick so the
            // first decrement lands a full second after start.
            ticks.tick().await;

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    _ = ticks.tick() => {
                        let previous = task_remaining.fetch_sub(1, Ordering::SeqCst);
                        if previous <= 1 {
                            task_remaining.store(0, Ordering::SeqCst);
                            debug!(epoch, "conversation budget exhausted");
                            let _ = events.send(EngineEvent::BudgetExhausted { epoch });
                            return;
                        }
                    }
                }
            }
        });

        Self { remaining, cancel }
    }

    /// Seconds left on the budget. Zero once expired.
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Stops the countdown without firing the termination signal.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_budget_exhausted_once_at_zero() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let countdown = Countdown::start(3, tx, 7);

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(countdown.remaining(), 0);
        match rx.recv().await {
            Some(EngineEvent::BudgetExhausted { epoch }) => assert_eq!(epoch, 7),
            other => panic!("expected BudgetExhausted, got {:?}", other),
        }
        // The ticker stopped itself; no further events.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_the_signal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let countdown = Countdown::start(2, tx, 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(countdown.remaining(), 1);
        countdown.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down_per_second() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let countdown = Countdown::start(10, tx, 0);

        assert_eq!(countdown.remaining(), 10);
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(countdown.remaining(), 7);
    }
}
