use std::{future::Future, ops::ControlFlow};

use anyhow::{Context, Result};
use tokio::{
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/// Background task that calls `on_tick` once per period until the callback
/// breaks or the ticker is stopped. At most one task is live per ticker.
pub struct Ticker {
    period: Duration,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
            cancel_token: None,
        }
    }

    /// Starts ticking, stopping any previous task first. The first tick lands
    /// one full period after the call. The callback receives the task's
    /// cancellation token so it can bail out if it was stopped mid-tick.
    pub fn start<F, Fut>(&mut self, mut on_tick: F)
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        self.stop();

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if on_tick(token_clone.clone()).await.is_break() {
                            break;
                        }
                    }
                    _ = token_clone.cancelled() => break,
                }
            }
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    /// Signals the task to stop without waiting for it. Safe to call when
    /// nothing is running.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.handle = None;
    }

    /// Stops the task and waits for it to finish.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.context("ticker task failed to join")
        } else {
            Ok(())
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    fn counting_ticker(limit: u32) -> (Ticker, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let mut ticker = Ticker::new(Duration::from_secs(1));
        let counter = count.clone();
        ticker.start(move |_| {
            let counter = counter.clone();
            async move {
                let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if seen >= limit {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
        });
        (ticker, count)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_until_break() {
        let (mut ticker, count) = counting_ticker(3);

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!ticker.is_active());
        ticker.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticking() {
        let (mut ticker, count) = counting_ticker(u32::MAX);

        time::sleep(Duration::from_millis(2_500)).await;
        ticker.stop();
        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!ticker.is_active());
    }

    #[tokio::test]
    async fn stopping_idle_ticker_is_noop() {
        let mut ticker = Ticker::new(Duration::from_secs(1));
        ticker.stop();
        ticker.shutdown().await.unwrap();
        assert!(!ticker.is_active());
    }
}
