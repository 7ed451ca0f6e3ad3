//! Backoff for read queries.
//!
//! Only failures that might clear on their own are repeated: lost
//! connections, timeouts, 408, 429 and 5xx. Rejections such as 400/409/422
//! come back on the first attempt. Mutations never go through here since a
//! gesture must map to a single request.

use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 200;
pub const DEFAULT_MAX_DELAY_MS: u64 = 2000;

/// How many times a read is repeated and how long to pause in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts on top of the first one.
    pub max_retries: u32,
    /// Pause before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for any single pause.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RETRIES,
            DEFAULT_INITIAL_DELAY_MS,
            DEFAULT_MAX_DELAY_MS,
        )
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    pub fn from_query_config(config: &clinic_core::QueryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_delay_ms,
            config.max_delay_ms,
        )
    }

    /// Single attempt, no pauses.
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Pause before retry number `attempt + 1`: the initial delay doubled
    /// `attempt` times, clamped to `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let doubled = 1u32
            .checked_shl(attempt)
            .map_or(self.max_delay, |factor| self.initial_delay.saturating_mul(factor));
        doubled.min(self.max_delay)
    }
}

/// Drive `operation` under `config`. The final error is returned once the
/// budget runs out or a failure is not worth repeating.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt = attempt + 1, "read recovered");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !err.is_retryable() {
            tracing::debug!(error = %err, "not retrying");
            return Err(err);
        }
        if attempt >= config.max_retries {
            tracing::error!(attempts, error = %err, "read failed, giving up");
            return Err(err);
        }

        let pause = config.delay_for_attempt(attempt);
        attempt += 1;
        tracing::warn!(attempt, max = attempts, error = %err, ?pause, "read failed, retrying");
        tokio::time::sleep(pause).await;
    }
}
