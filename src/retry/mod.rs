//! Fixed-delay retry policy shared by every outbound call.
//!
//! The explorer client, the chain reader, the bootstrap download and the
//! Telegram notifier all take a [`RetryPolicy`] instead of looping on their
//! own. Errors opt in to retrying through [`Transient`]; anything else is
//! returned to the caller on the first occurrence.
//!
//! Sleeping goes through `tokio::time`, so tests drive the policy on a
//! paused clock without real delays.

use std::fmt::Display;
use std::future::Future;
use rand::Rng;
use std::time::Duration;
use tracing::{error, warn};

/// Errors that may succeed when the same request is issued again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait between attempts.
    pub delay: Duration,
    /// Total attempts including the first. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Upper bound of a random extra wait added to `delay`.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(60))
    }
}

impl RetryPolicy {
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
            jitter: Duration::ZERO,
        }
    }

    pub fn capped(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts.max(1)),
            jitter: Duration::ZERO,
        }
    }

    /// Wait before the next attempt.
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        self.delay + rand::thread_rng().gen_range(Duration::ZERO..=self.jitter)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(false, |max| attempt >= max)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt cap is hit.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if self.exhausted(attempt) => {
                    error!(what = what, attempts = attempt, error = %e, "giving up after retries");
                    return Err(e);
                }
                Err(e) => {
                    let wait = self.next_delay();
                    warn!(
                        what = what,
                        attempt = attempt,
                        retry_in_secs = wait.as_secs(),
                        error = %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
