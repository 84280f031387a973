use std::future::Future;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Owned background task. Cancelled on [`TimerTask::cancel`] or on drop.
#[derive(Debug)]
pub struct TimerTask {
    token: CancellationToken,
}

impl TimerTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = child.cancelled() => {}
                _ = future => {}
            }
        });
        Self { token }
    }

    /// Runs `callback` once after `delay`.
    pub fn after<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        })
    }

    /// Runs `callback` every `period`, first after one period, until it returns false.
    pub fn every<F>(period: Duration, mut callback: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if !callback() {
                    break;
                }
            }
        })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
