//! Delay schedule between generation attempts.

use std::time::Duration;

/// Bounded exponential back-off between generation attempts.
///
/// Attempt `n` (1-based) that fails with a retryable error is followed by a
/// wait of `base_delay * 2^(n-1)`, capped at `max_delay`. No wait follows the
/// final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffPolicy {
    /// Creates a policy. `max_attempts` is raised to at least one.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// A policy that retries without waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    /// Five attempts, waiting 2s, 4s, 8s, then 10s between them.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(2), Duration::from_secs(10))
    }
}
