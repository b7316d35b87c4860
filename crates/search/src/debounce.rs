//! Single-slot cancellable timer.
//!
//! Starting the timer replaces whatever was pending, so only the newest
//! request can fire. A fired timer empties its slot and fires once.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    pending: Option<Pin<Box<Sleep>>>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer, superseding any pending deadline.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        let deadline = Instant::now() + self.delay;
        match self.pending.as_mut() {
            Some(sleep) => sleep.as_mut().reset(deadline),
            None => self.pending = Some(Box::pin(tokio::time::sleep_until(deadline))),
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for the pending deadline. Returns `false` at once if nothing is armed.
    ///
    /// Dropping the returned future before it completes leaves the timer armed.
    pub async fn fired(&mut self) -> bool {
        let Some(sleep) = self.pending.as_mut() else {
            return false;
        };
        sleep.as_mut().await;
        self.pending = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let mut timer = DebounceTimer::new(Duration::from_millis(150));
        let start = Instant::now();
        timer.start();
        assert!(timer.is_pending());

        assert!(timer.fired().await);
        assert!(start.elapsed() >= Duration::from_millis(150));
        assert!(!timer.is_pending());
        assert!(!timer.fired().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_pushes_deadline() {
        let mut timer = DebounceTimer::new(Duration::from_millis(150));
        let start = Instant::now();
        timer.start();

        tokio::time::advance(Duration::from_millis(100)).await;
        timer.start();

        assert!(timer.fired().await);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let mut timer = DebounceTimer::new(Duration::from_millis(150));
        timer.start();
        timer.cancel();
        assert!(!timer.is_pending());
        assert!(!timer.fired().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_fired_before_deadline() {
        let mut timer = DebounceTimer::new(Duration::from_millis(150));
        timer.start();

        let early = tokio::time::timeout(Duration::from_millis(100), timer.fired()).await;
        assert!(early.is_err());
        assert!(timer.is_pending());
    }
}
