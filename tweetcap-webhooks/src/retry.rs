//! Backoff policy for webhook retries

use std::time::Duration;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default ceiling for any single retry delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(300_000);

/// Exponential backoff: `min(base * 2^retry_count, cap)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay for `retry_count == 0`
    pub base: Duration,

    /// Maximum delay between retries
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_DELAY,
            cap: DEFAULT_MAX_DELAY,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with a custom base and cap
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Calculate the delay before the retry numbered `retry_count` (0-based)
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.cap, |delay| delay.min(self.cap))
    }
}

/// Delay under the default policy
pub fn backoff(retry_count: u32) -> Duration {
    BackoffPolicy::default().delay_for(retry_count)
}
