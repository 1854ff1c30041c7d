//! Bounded retry with backoff for a single unit of work.
//!
//! [`retry`] re-runs an async operation until it succeeds or the
//! [`RetryPolicy`] budget is spent. The backoff is a plain
//! `tokio::time::sleep` inside the operation's own future, so while one tile
//! waits to be retried every other in-flight tile keeps making progress.
//!
//! The terminal error is handed back as a value inside [`Retried`]; deciding
//! what a final failure means is up to the caller.

mod policy;

pub use policy::{
    Backoff, RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_DELAY_SECS, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_BASE_DELAY_MS,
};

use std::future::Future;
use std::time::Duration;

/// Details passed to the retry observer before each retry.
#[derive(Debug)]
pub struct RetryAttempt<'a, E> {
    /// The retry about to happen (1 = first retry, i.e. second attempt).
    pub retry: u32,
    /// Delay that will elapse before the retry is issued.
    pub delay: Duration,
    /// The error that triggered the retry.
    pub error: &'a E,
}

/// Final result of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T, E> {
    /// The successful value, or the error of the last attempt.
    pub result: Result<T, E>,
    /// Attempts made, including the first.
    pub attempts: u32,
}

impl<T, E> Retried<T, E> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs `op` under `policy`.
///
/// `op` receives the 1-based attempt number. A successful attempt is never
/// repeated. After a failure, `on_retry` is called and the task sleeps for
/// the policy's delay before trying again; once the budget is exhausted the
/// last error is returned.
///
/// # Example
///
/// ```ignore
/// let retried = retry(&policy, |_attempt| client.request(&url), |r| {
///     warn!(url = %url, retry = r.retry, "Retrying tile");
/// })
/// .await;
/// ```
pub async fn retry<T, E, Op, Fut, OnRetry>(
    policy: &RetryPolicy,
    mut op: Op,
    mut on_retry: OnRetry,
) -> Retried<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    OnRetry: FnMut(RetryAttempt<'_, E>),
{
    let mut attempt = 1;
    loop {
        let error = match op(attempt).await {
            Ok(value) => {
                return Retried {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(error) => error,
        };

        let Some(delay) = policy.delay_for_retry(attempt) else {
            return Retried {
                result: Err(error),
                attempts: attempt,
            };
        };

        on_retry(RetryAttempt {
            retry: attempt,
            delay,
            error: &error,
        });
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
