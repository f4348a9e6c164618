//! Bounded exponential backoff for transient upstream failures.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based): `base_delay * 2^(retry-1)`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `operation`, retrying while `is_transient` classifies the error
    /// as transient and retries remain. Non-transient errors and the last
    /// error after exhaustion are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the operation's error as described above.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        operation_name: &str,
        is_transient: P,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut retries = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if retries > 0 {
                        info!(
                            operation = operation_name,
                            attempts = retries + 1,
                            "upstream call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if is_transient(&err) && retries < self.max_retries => {
                    retries += 1;
                    let delay = self.delay_for(retries);
                    warn!(
                        operation = operation_name,
                        retry = retries,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient upstream failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if is_transient(&err) {
                        error!(
                            operation = operation_name,
                            attempts = retries + 1,
                            error = %err,
                            "upstream still failing after all retries"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}
