//! Exponential backoff retry logic for transient failures.
//!
//! This module wraps graph API calls so that timeouts, dropped connections and
//! server-side errors are retried with exponentially growing delays, up to a fixed
//! attempt ceiling. The last error is returned unchanged once attempts run out.

use std::{fmt::Display, future::Future, time::Duration};

use serde::Deserialize;

use crate::GraphError;

/// Which failures a [`RetryPolicy`] retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    /// Retry only transient failures: timeouts, connection errors, 5xx and 429 statuses.
    #[default]
    Transient,
    /// Retry every error the wrapped operation returns, including 4xx statuses.
    AnyError,
}

/// Configuration for retry behavior.
///
/// The delay after the `n`-th failed attempt (1-based) is
/// `multiplier * 2^(n - 1)` seconds, clamped to `[min_delay, max_delay]`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cofactr_graph::reliability::{RetryOn, RetryPolicy};
///
/// // Default policy: 3 attempts, waits of 2s then 2s, never more than 10s
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
///
/// // Tests and latency-sensitive callers can drop the waits entirely
/// let fast = RetryPolicy {
///     min_delay: Duration::ZERO,
///     max_delay: Duration::ZERO,
///     ..RetryPolicy::default()
/// };
/// assert_eq!(fast.retry_on, RetryOn::Transient);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one (default: 3)
    pub max_attempts: u32,
    /// Multiplier applied to the exponential schedule, in seconds (default: 1.0)
    pub multiplier: f64,
    /// Lower bound of the delay between attempts (default: 2s)
    pub min_delay: Duration,
    /// Upper bound of the delay between attempts (default: 10s)
    pub max_delay: Duration,
    /// Error classification (default: [`RetryOn::Transient`])
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: 1.0,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            retry_on: RetryOn::Transient,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy with custom maximum attempts.
    ///
    /// # Examples
    ///
    /// ```
    /// use cofactr_graph::reliability::RetryPolicy;
    ///
    /// let policy = RetryPolicy::with_max_attempts(5);
    /// assert_eq!(policy.max_attempts, 5);
    /// ```
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    /// Policy that makes a single attempt.
    #[must_use]
    pub fn never() -> Self {
        Self::with_max_attempts(1)
    }

    /// Returns a copy of this policy with no waiting between attempts.
    #[must_use]
    pub fn without_delay(self) -> Self {
        Self { min_delay: Duration::ZERO, max_delay: Duration::ZERO, ..self }
    }

    /// Returns `true` if `error` should trigger another attempt under this policy.
    #[must_use]
    pub fn should_retry<E: Retryable>(&self, error: &E) -> bool {
        match self.retry_on {
            RetryOn::Transient => error.is_transient(),
            RetryOn::AnyError => true,
        }
    }

    /// Delay to wait after the given 1-based attempt failed.
    pub(crate) fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let seconds = self.multiplier * 2_f64.powi(exponent);
        let delay = Duration::try_from_secs_f64(seconds).unwrap_or(self.max_delay);
        delay.max(self.min_delay).min(self.max_delay)
    }
}

/// Errors that know whether retrying the failed operation can help.
pub trait Retryable {
    /// Returns `true` for failures that may succeed on a later attempt.
    fn is_transient(&self) -> bool;
}

impl Retryable for GraphError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

/// Attempt bookkeeping of one retried invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// Number of attempts made, including the successful one.
    pub attempt_number: u32,
    /// Total time spent sleeping between attempts.
    pub idle_for: Duration,
}

/// Result of a retried invocation together with its attempt bookkeeping.
#[derive(Debug)]
#[must_use = "the operation result is inside the outcome"]
pub struct RetryOutcome<T, E> {
    /// Value of the last attempt, or its error.
    pub result: Result<T, E>,
    /// Attempt bookkeeping.
    pub stats: RetryStats,
}

impl<T, E> RetryOutcome<T, E> {
    /// Discards the stats and returns the operation result.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Executes `operation` with exponential backoff retry and reports attempt stats.
///
/// The operation is attempted up to `policy.max_attempts` times (at least once).
/// Errors not accepted by [`RetryPolicy::should_retry`] are returned immediately.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// use cofactr_graph::{
///     GraphError,
///     reliability::{RetryPolicy, retry_with_stats},
/// };
///
/// # async fn example() {
/// let policy = RetryPolicy::default().without_delay();
/// let calls = AtomicU32::new(0);
///
/// let outcome = retry_with_stats(&policy, || async {
///     if calls.fetch_add(1, Ordering::Relaxed) == 0 {
///         Err(GraphError::Status { status: 503, body: String::new() })
///     } else {
///         Ok("ok")
///     }
/// })
/// .await;
///
/// assert_eq!(outcome.stats.attempt_number, 2);
/// assert_eq!(outcome.result.unwrap(), "ok");
/// # }
/// ```
pub async fn retry_with_stats<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display + Retryable,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut stats = RetryStats::default();

    loop {
        stats.attempt_number += 1;
        let attempt = stats.attempt_number;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return RetryOutcome { result: Ok(value), stats };
            }
            Err(error) => {
                let retryable = policy.should_retry(&error);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    retryable,
                    error = %error,
                    "Operation failed"
                );

                if !retryable || attempt >= max_attempts {
                    return RetryOutcome { result: Err(error), stats };
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(delay_ms = delay.as_millis(), "Sleeping before retry");
                tokio::time::sleep(delay).await;
                stats.idle_for += delay;
            }
        }
    }
}

/// Executes `operation` with exponential backoff retry.
///
/// Same as [`retry_with_stats`] without the attempt bookkeeping.
///
/// # Errors
///
/// Returns the last error encountered if all attempts fail, or the first
/// non-retryable error.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display + Retryable,
{
    retry_with_stats(policy, operation).await.into_result()
}

/// Determines if an error is retryable under the default policy.
///
/// # Examples
///
/// ```
/// use cofactr_graph::{GraphError, reliability::is_retryable};
///
/// assert!(is_retryable(&GraphError::Status { status: 502, body: String::new() }));
/// assert!(!is_retryable(&GraphError::Status { status: 404, body: String::new() }));
/// assert!(!is_retryable(&GraphError::BatchTooLarge { requested: 501, max: 500 }));
/// ```
#[must_use]
pub fn is_retryable(error: &GraphError) -> bool {
    error.is_transient()
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    fn server_error() -> GraphError {
        GraphError::Status { status: 500, body: "boom".to_owned() }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.min_delay, Duration::from_secs(2));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert!((policy.multiplier - 1.0).abs() < f64::EPSILON);
        assert_eq!(policy.retry_on, RetryOn::Transient);
    }

    #[test]
    fn test_retry_policy_with_max_attempts() {
        let policy = RetryPolicy::with_max_attempts(5);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.min_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_delay_schedule_default() {
        let policy = RetryPolicy::default();
        // 1s and 2s are raised to the 2s floor
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(10));
    }

    #[test]
    fn test_delay_capped_for_huge_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(10_000), Duration::from_secs(10));
    }

    #[test]
    fn test_delay_without_delay() {
        let policy = RetryPolicy::default().without_delay();
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(7), Duration::ZERO);
    }

    #[test]
    fn test_should_retry_transient_only() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&server_error()));
        assert!(!policy.should_retry(&GraphError::Status { status: 422, body: String::new() }));
    }

    #[test]
    fn test_should_retry_any_error() {
        let policy = RetryPolicy { retry_on: RetryOn::AnyError, ..RetryPolicy::default() };
        assert!(policy.should_retry(&GraphError::Status { status: 404, body: String::new() }));
        assert!(policy.should_retry(&GraphError::InvalidInput("x".to_owned())));
    }

    #[tokio::test]
    async fn test_succeeds_immediately() {
        let policy = RetryPolicy::default();
        let outcome = retry_with_stats(&policy, || async { Ok::<_, GraphError>(42) }).await;

        assert_eq!(outcome.stats.attempt_number, 1);
        assert_eq!(outcome.stats.idle_for, Duration::ZERO);
        assert_eq!(outcome.result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_non_transient_fails_immediately() {
        let policy = RetryPolicy::default();
        let outcome = retry_with_stats(&policy, || async {
            Err::<(), _>(GraphError::Status { status: 404, body: "not found".to_owned() })
        })
        .await;

        assert_eq!(outcome.stats.attempt_number, 1);
        assert_eq!(outcome.result.unwrap_err().status(), Some(404));
    }

    #[tokio::test]
    async fn test_fails_then_succeeds() {
        let policy = RetryPolicy::default().without_delay();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let outcome = retry_with_stats(&policy, || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(server_error())
                } else {
                    Ok(true)
                }
            }
        })
        .await;

        assert!(outcome.result.unwrap());
        assert_eq!(outcome.stats.attempt_number, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fails_for_full_retry_period() {
        let policy = RetryPolicy::default().without_delay();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let outcome = retry_with_stats(&policy, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(server_error())
            }
        })
        .await;

        assert!(matches!(outcome.result, Err(GraphError::Status { status: 500, .. })));
        assert_eq!(outcome.stats.attempt_number, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_any_error_retries_client_errors() {
        let policy =
            RetryPolicy { retry_on: RetryOn::AnyError, ..RetryPolicy::default() }.without_delay();
        let outcome = retry_with_stats(&policy, || async {
            Err::<(), _>(GraphError::Status { status: 400, body: String::new() })
        })
        .await;

        assert_eq!(outcome.stats.attempt_number, 3);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let policy = RetryPolicy::never();
        let outcome = retry_with_stats(&policy, || async { Err::<(), _>(server_error()) }).await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.stats.attempt_number, 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::with_max_attempts(0);
        let outcome = retry_with_stats(&policy, || async { Ok::<_, GraphError>(()) }).await;

        assert_eq!(outcome.stats.attempt_number, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_schedule_sleeps_between_attempts() {
        let policy = RetryPolicy::default();
        let start = tokio::time::Instant::now();

        let outcome = retry_with_stats(&policy, || async { Err::<(), _>(server_error()) }).await;

        // Waits of 2s after attempt 1 and 2s after attempt 2, none after the last
        assert_eq!(outcome.stats.idle_for, Duration::from_secs(4));
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_retry_with_backoff_discards_stats() {
        let policy = RetryPolicy::default();
        let result = retry_with_backoff(&policy, || async { Ok::<_, GraphError>("done") }).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[test]
    fn test_is_retryable_classification() {
        assert!(is_retryable(&server_error()));
        assert!(is_retryable(&GraphError::Status { status: 429, body: String::new() }));
        assert!(!is_retryable(&GraphError::UnknownSchema("x".to_owned())));
        assert!(!is_retryable(&GraphError::ConfigError("x".to_owned())));
    }
}
