//! Backoff policy for transient service failures.

use std::time::Duration;

use rand::Rng;

/// Wall-clock budget for retrying a single request.
pub const DEFAULT_RETRY_DEADLINE: Duration = Duration::from_secs(60);

/// Randomised exponential backoff bounded by a deadline.
///
/// The ceiling for attempt `n` is `initial_wait * 2^(n-1)`, capped at
/// `max_wait`; the actual wait is drawn uniformly from `[0, ceiling]` and
/// never extends past the deadline.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wfs_replica_core::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.backoff_ceiling(1), Duration::from_millis(100));
/// assert_eq!(policy.backoff_ceiling(3), Duration::from_millis(400));
/// assert_eq!(policy.backoff_ceiling(30), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    initial_wait: Duration,
    max_wait: Duration,
    deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(100),
            Duration::from_secs(5),
            DEFAULT_RETRY_DEADLINE,
        )
    }
}

impl RetryPolicy {
    /// Build a policy from its three bounds.
    #[must_use]
    pub const fn new(initial_wait: Duration, max_wait: Duration, deadline: Duration) -> Self {
        Self {
            initial_wait,
            max_wait,
            deadline,
        }
    }

    /// Replace the deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Replace the first backoff ceiling.
    #[must_use]
    pub const fn with_initial_wait(mut self, initial_wait: Duration) -> Self {
        self.initial_wait = initial_wait;
        self
    }

    /// Replace the largest backoff ceiling.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Total time allowed for one request including retries.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Upper bound on the wait after attempt `attempt` (1-based).
    #[must_use]
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_wait
            .saturating_mul(1_u32 << exponent)
            .min(self.max_wait)
    }

    /// Wait before the next attempt, or `None` once `elapsed` has reached the
    /// deadline.
    pub fn next_wait<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        elapsed: Duration,
        rng: &mut R,
    ) -> Option<Duration> {
        let remaining = self
            .deadline
            .checked_sub(elapsed)
            .filter(|left| !left.is_zero())?;
        let ceiling = u64::try_from(self.backoff_ceiling(attempt).as_nanos()).unwrap_or(u64::MAX);
        let wait = Duration::from_nanos(rng.gen_range(0..=ceiling));
        Some(wait.min(remaining))
    }
}
