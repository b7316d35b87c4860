//! Bounded, fixed-delay retry for storage calls.

use std::future::Future;
use std::time::Duration;

use crate::Error;

/// Default number of attempts per storage call.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default delay between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: DEFAULT_ATTEMPTS, delay: DEFAULT_DELAY }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts: attempts.max(1), delay }
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// `what` and `key` only label the log lines.
    pub async fn run<T, F, Fut>(&self, what: &str, key: &str, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    tracing::debug!(what, key, attempt, error = %e, "storage call failed, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(what, key, attempts, error = %e, "storage call failed, giving up");
                    return Err(e);
                }
            }
        }
    }
}
