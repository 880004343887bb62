use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::error::{BackendError, ChatError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(2000);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 5.0;
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_millis(3 * 60_000);

/// Bounded exponential backoff for a single backend call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
    /// Decides whether a failed attempt may be repeated.
    pub retry_on: fn(&BackendError) -> bool,
}

fn retry_any(_error: &BackendError) -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_backoff: DEFAULT_MAX_BACKOFF,
            retry_on: retry_any,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        backoff_multiplier: f64,
        max_backoff: Duration,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            backoff_multiplier,
            max_backoff,
            retry_on: retry_any,
        }
    }

    /// Default timings, but only transport faults, throttling and 5xx
    /// responses are retried.
    pub fn transient_only() -> Self {
        Self {
            retry_on: BackendError::is_transient,
            ..Self::default()
        }
    }

    /// A policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_retry_on(mut self, retry_on: fn(&BackendError) -> bool) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Delay before retry number `retry` (1-based), capped at `max_backoff`.
    pub fn backoff_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Run `operation` under `policy`.
///
/// The closure receives the 1-based attempt number. Errors rejected by the
/// policy's predicate come back as [`ChatError::Backend`] without waiting;
/// running out of attempts yields [`ChatError::RetryExhausted`] wrapping the
/// last failure.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, ChatError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if !(policy.retry_on)(&error) => return Err(ChatError::Backend(error)),
            Err(error) if attempt >= max_attempts => {
                return Err(ChatError::RetryExhausted {
                    attempts: attempt,
                    source: error,
                });
            }
            Err(_) => {
                let delay = policy.backoff_for_retry(attempt);
                debug!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Backend call failed, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
