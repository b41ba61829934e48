//! Retry - Bounded exponential backoff
//!
//! Retries are only used at designated points (the target cleanup loop).
//! Every other remote call is issued once and its error propagated.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

use crate::error::{ProviderError, ProviderResult};

/// Backoff policy bounded by a wall-clock timeout
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the second attempt
    #[serde(with = "millis")]
    pub initial_backoff: Duration,
    /// Upper bound for a single delay
    #[serde(with = "millis")]
    pub max_backoff: Duration,
    pub multiplier: u32,
    /// Total time budget across all attempts
    #[serde(with = "millis")]
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            multiplier: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Delay before attempt `attempt + 1` (attempt is 1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// next delay would exceed the timeout. The last error is returned.
    pub async fn retry<T, F, Fut, R>(&self, mut op: F, retryable: R) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
        R: Fn(&ProviderError) -> bool,
    {
        let deadline = Instant::now() + self.timeout;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !retryable(&err) {
                return Err(err);
            }

            let delay = self.backoff(attempt);
            if Instant::now() + delay > deadline {
                log::warn!(
                    "giving up after {} attempts ({:?} timeout): {}",
                    attempt,
                    self.timeout,
                    err
                );
                return Err(err);
            }

            log::warn!("attempt {} failed, retrying in {:?}: {}", attempt, delay, err);
            tokio::time::sleep(delay).await;
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
