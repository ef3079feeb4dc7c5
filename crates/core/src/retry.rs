//! Retry policy and exponential-backoff delay computation.

use std::time::Duration;

use crate::failure::FailureKind;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on the delay between retries.
    pub cap: Duration,
    /// Factor by which the delay grows per retry.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Delay before the retry numbered `retry_count` (0-based: the first retry
/// waits `base`). The result is clamped to [`BackoffConfig::cap`].
pub fn delay_for_retry(retry_count: u32, config: &BackoffConfig) -> Duration {
    let factor = config.multiplier.powi(retry_count as i32);
    let millis = (config.base.as_millis() as f64 * factor) as u64;
    Duration::from_millis(millis).min(config.cap)
}

/// Whether a failed attempt should be retried.
///
/// Requires a retryable failure kind and remaining retry budget.
pub fn should_retry(kind: FailureKind, retry_count: i32, max_retries: i32) -> bool {
    kind.is_retryable() && retry_count < max_retries
}
