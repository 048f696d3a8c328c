//! Retry with exponential backoff, reusable around any single upstream request.

use crate::upstream::UpstreamError;
use std::time::Duration;

/// Default attempts per request: the first try plus two retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Delay before the first retry; doubles for each later retry (1s, 2s, ...).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Waits between attempts. Swapped out in tests so backoff can be observed without sleeping.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread. Other aggregation threads keep running.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Retry policy: attempt budget, base backoff delay, and which errors are retryable.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    retryable: fn(&UpstreamError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// Policy retrying transient errors. `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            retryable: UpstreamError::is_transient,
        }
    }

    /// Replace the retryable-error predicate.
    pub fn with_predicate(mut self, retryable: fn(&UpstreamError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (0-based): base * 2^retry.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32.checked_shl(retry.min(16)).unwrap_or(u32::MAX))
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt budget is spent.
    ///
    /// `op` receives the 0-based attempt number. The last error is returned on failure.
    pub fn run<T, F>(&self, sleeper: &dyn Sleeper, mut op: F) -> Result<T, UpstreamError>
    where
        F: FnMut(u32) -> Result<T, UpstreamError>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if (self.retryable)(&e) && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "upstream request failed, retrying"
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
