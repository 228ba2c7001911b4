//! Fixed-interval retry policy.
//!
//! Both the guest's offer discovery and transient relay failures are retried
//! the same way: a bounded number of attempts spaced by a fixed interval,
//! optionally with random jitter. No sleep follows the final attempt.

use std::{fmt::Display, future::Future, time::Duration};

use rand::Rng;
use thiserror::Error;

/// Every attempt of a `poll_until` came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("gave up after {attempts} attempts")]
pub struct RetryExhausted {
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Upper bound of the random delay added to each interval
    pub jitter: Duration,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        self.interval + Duration::from_millis(extra)
    }

    /// Run `attempt` until it yields a value or the attempt budget is spent.
    ///
    /// `attempt` receives the 1-based attempt number.
    pub async fn poll_until<T, F, Fut>(&self, mut attempt: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for n in 1..=self.max_attempts {
            if let Some(value) = attempt(n).await {
                return Ok(value);
            }
            if n < self.max_attempts {
                tokio::time::sleep(self.delay()).await;
            }
        }
        Err(RetryExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Run `operation` again while it fails with an error `is_retryable` accepts.
    ///
    /// The last error is returned once the budget is spent.
    pub async fn retry<T, E, F, Fut, R>(&self, mut operation: F, is_retryable: R) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: Display,
    {
        let mut n = 1;
        loop {
            match operation(n).await {
                Ok(value) => return Ok(value),
                Err(e) if n < self.max_attempts && is_retryable(&e) => {
                    tracing::warn!("Attempt {}/{} failed: {}", n, self.max_attempts, e);
                    tokio::time::sleep(self.delay()).await;
                    n += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
