//! Exponential backoff policy for failed transport attempts.

use std::time::Duration;

/// Delay before the first retry.
pub const INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Multiplier applied to the delay after every further failure.
pub const BACKOFF_FACTOR: f64 = 2.0;

/// How many times a request is attempted and how long to wait in between.
///
/// Retries are blind: every failure reported by the transport is retried the
/// same way, whatever the method or failure kind.
///
/// # Examples
///
/// ```
/// use vapor_client::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3);
///
/// // 1s after the first failure, 2s after the second, then give up.
/// assert_eq!(policy.delay_after_failure(1), Some(Duration::from_millis(1000)));
/// assert_eq!(policy.delay_after_failure(2), Some(Duration::from_millis(2000)));
/// assert_eq!(policy.delay_after_failure(3), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: usize,
    initial_delay: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    /// Creates a policy allowing at most `max_attempts` transport calls.
    ///
    /// A value of `0` is treated as `1`: the request is always attempted once.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: INITIAL_DELAY,
            backoff_factor: BACKOFF_FACTOR,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    /// Returns how long to wait after `failures` failed attempts, or `None`
    /// once the attempt budget is spent.
    ///
    /// The wait after the n-th failure is `initial_delay * backoff_factor^(n-1)`.
    pub fn delay_after_failure(&self, failures: usize) -> Option<Duration> {
        if failures == 0 || failures >= self.max_attempts {
            return None;
        }

        let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }

    /// Sum of every delay the policy can impose if all attempts fail.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts)
            .filter_map(|failures| self.delay_after_failure(failures))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
