//! # Elapsed-Time Ticker
//!
//! Repeating timer that drives periodic status refreshes while a load is in
//! flight. The manager spawns one ticker per load and cancels it on any exit
//! from the `Loading` state; no ticker exists outside of `Loading`.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

/// Handle to a spawned periodic timer.
///
/// Cancellation is cooperative: cancelling (or dropping) the handle stops
/// the timer task at its next scheduling point. Dropping the handle is the
/// normal teardown path, so clearing the manager's ticker slot is enough to
/// guarantee no stray refreshes.
pub(crate) struct Ticker {
    cancel: CancellationToken,
}

impl Ticker {
    /// Spawn a timer that invokes `on_tick` once per interval until
    /// cancelled.
    pub fn spawn<F>(period: Duration, on_tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut interval = time::interval(period);
            // The first tick of a tokio interval completes immediately;
            // consume it so the first refresh lands one full period after
            // the load starts.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => on_tick(),
                }
            }
        });

        Self { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
