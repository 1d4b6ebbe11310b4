//! Reconnect strategy for dependencies that are not yet reachable.
//!
//! The worker may start before Postgres or the queue is up. Startup calls are
//! wrapped in [`retry`], which keeps trying under a [`RetryPolicy`] instead of
//! failing the process. Tests pass a zero-delay policy.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

/// Largest exponent applied to the multiplier; keeps the math from overflowing.
const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    /// Total attempts including the first; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Same delay between every attempt, unbounded.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1,
            max_attempts: None,
        }
    }

    /// Doubling delay starting at `initial`, capped at `max`, unbounded.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max.max(initial),
            multiplier: 2,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max.max(1))
    }
}

/// Run `op` until it succeeds or the policy runs out of attempts.
///
/// Each failure is logged at `warn` with the upcoming delay. The error of the
/// final attempt is returned when attempts are exhausted.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(what, attempt, "{what} available");
                }
                return Ok(value);
            }
            Err(e) if policy.exhausted(attempt) => {
                warn!(what, attempt, error = %e, "Giving up waiting for {what}");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Waiting for {what}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
