//! Bounded retry for navigation

use std::time::Duration;

/// Exponential backoff: `base_delay`, doubled after every failed attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum attempts including the first request.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// 3 attempts, waiting 1s then 2s.
    pub fn navigation_default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    /// Delay after the given failed attempt (1-based), `None` when out of attempts.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let shift = attempt.saturating_sub(1).min(31);
        Some(self.base_delay.saturating_mul(1u32 << shift))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::navigation_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_attempts_run_out() {
        let policy = RetryPolicy::navigation_default();
        assert_eq!(policy.delay_after(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_after(3), None);
    }

    #[test]
    fn zero_attempts_is_clamped() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay_after(1), None);
    }
}
