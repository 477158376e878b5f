//! Reliability patterns for graph API calls.
//!
//! Provides exponential-backoff retry for transient failures when talking to the
//! graph API.

mod retry;

pub use retry::{
    RetryOn, RetryOutcome, RetryPolicy, RetryStats, Retryable, is_retryable, retry_with_backoff,
    retry_with_stats,
};
