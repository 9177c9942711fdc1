//! Retry policy for the sync long poll.

use std::time::Duration;

/// Exponential backoff with an attempt budget.
///
/// The delay before retry `n` (zero-based) is `initial_delay * 2^n`, capped
/// at `max_delay`. After `max_attempts` consecutive failures the error is
/// returned to the caller. A successful request resets the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Consecutive failures tolerated before giving up.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { initial_delay: Duration::from_secs(1), max_delay: Duration::from_secs(30), max_attempts: 8 }
    }
}

impl RetryPolicy {
    /// Delay before retrying after `failures` consecutive failures, or `None`
    /// when the budget is spent.
    pub fn delay_for(&self, failures: u32) -> Option<Duration> {
        if failures == 0 || failures > self.max_attempts {
            return None;
        }

        let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
        Some(self.initial_delay.saturating_mul(factor).min(self.max_delay))
    }
}
