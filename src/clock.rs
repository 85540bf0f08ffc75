//! The pausable game clock.
//!
//! A counter of whole seconds gated by three booleans owned by the engine:
//! ticking happens iff `running && !loading && !won`. The ticker task is tied
//! to the session through a cancellation token, so dropping the clock (or
//! discarding the session) always tears the task down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct GameClock {
    elapsed: Arc<AtomicU64>,
    tick_interval: Duration,
    /// Root token for the whole clock; cancelled on drop.
    session_token: CancellationToken,
    /// Token of the currently running ticker task, if any.
    ticker: Mutex<Option<CancellationToken>>,
}

impl GameClock {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            elapsed: Arc::new(AtomicU64::new(0)),
            tick_interval,
            session_token: CancellationToken::new(),
            ticker: Mutex::new(None),
        }
    }

    /// Whole seconds accumulated so far. No partial-second carry is kept.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    /// Reconcile the ticker with the current state booleans.
    ///
    /// Idempotent: re-asserting the current gating state neither restarts the
    /// period nor double-ticks. Must be called from within a tokio runtime.
    pub fn update(&self, running: bool, loading: bool, won: bool) {
        let should_tick = running && !loading && !won;
        let mut ticker = self
            .ticker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if should_tick && ticker.is_none() {
            debug!("game clock ticking");
            *ticker = Some(self.spawn_ticker());
        } else if !should_tick {
            if let Some(token) = ticker.take() {
                debug!("game clock paused");
                token.cancel();
            }
        }
    }

    /// Zero the counter and stop ticking. Used when a session is replaced.
    pub fn reset(&self) {
        self.update(false, false, false);
        self.elapsed.store(0, Ordering::SeqCst);
    }

    /// Preload the counter, e.g. when resuming a captured session.
    pub fn set_elapsed(&self, seconds: u64) {
        self.elapsed.store(seconds, Ordering::SeqCst);
    }

    fn spawn_ticker(&self) -> CancellationToken {
        let token = self.session_token.child_token();
        let task_token = token.clone();
        let elapsed = Arc::clone(&self.elapsed);
        let period = self.tick_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {
                        elapsed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });
        token
    }
}

impl Drop for GameClock {
    fn drop(&mut self) {
        // The ticker never outlives its session.
        self.session_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> GameClock {
        GameClock::new(Duration::from_secs(1))
    }

    async fn advance_secs(n: u64) {
        for _ in 0..n {
            tokio::time::advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_while_gated_open() {
        let clock = clock();
        clock.update(true, false, false);
        tokio::task::yield_now().await;
        advance_secs(3).await;
        assert_eq!(clock.elapsed_seconds(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_tick_before_running() {
        let clock = clock();
        clock.update(false, false, false);
        advance_secs(3).await;
        assert_eq!(clock.elapsed_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_pauses() {
        let clock = clock();
        clock.update(true, false, false);
        tokio::task::yield_now().await;
        advance_secs(2).await;

        clock.update(true, true, false);
        advance_secs(5).await;
        assert_eq!(clock.elapsed_seconds(), 2);

        clock.update(true, false, false);
        tokio::task::yield_now().await;
        advance_secs(1).await;
        assert_eq!(clock.elapsed_seconds(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_won_stops_for_good() {
        let clock = clock();
        clock.update(true, false, false);
        tokio::task::yield_now().await;
        advance_secs(2).await;

        clock.update(true, false, true);
        advance_secs(10).await;
        assert_eq!(clock.elapsed_seconds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_is_idempotent() {
        let clock = clock();
        clock.update(true, false, false);
        clock.update(true, false, false);
        clock.update(true, false, false);
        tokio::task::yield_now().await;
        advance_secs(2).await;
        assert_eq!(clock.elapsed_seconds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_zeroes_and_stops() {
        let clock = clock();
        clock.update(true, false, false);
        tokio::task::yield_now().await;
        advance_secs(4).await;
        clock.reset();
        advance_secs(4).await;
        assert_eq!(clock.elapsed_seconds(), 0);
    }

    #[test]
    fn test_update_recovers_from_poisoned_lock() {
        let clock = clock();
        // Panic while holding the ticker lock to poison it.
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = clock.ticker.lock().unwrap();
            panic!("poison");
        }));
        assert!(clock.ticker.lock().is_err());
        // Must not panic; no ticker to cancel and the gate stays closed.
        clock.update(false, false, false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_ticker() {
        let clock = clock();
        clock.update(true, false, false);
        tokio::task::yield_now().await;
        let elapsed = Arc::clone(&clock.elapsed);
        drop(clock);
        advance_secs(5).await;
        assert_eq!(elapsed.load(Ordering::SeqCst), 0);
    }
}
