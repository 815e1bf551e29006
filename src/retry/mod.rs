//! Time-bounded retry for operations racing freshly created dependencies.
//!
//! The operation reports each attempt as a [`RetryDecision`]. Retryable
//! failures are re-attempted on an exponential schedule until the timeout
//! elapses. The last sleep is clamped to the remaining budget, so one final
//! attempt runs at the deadline and its error is the one surfaced.

mod error;

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backoff::Backoff;
use crate::error::Classify;
use crate::wait::until_cancelled;

pub use error::{AbsenceError, RetryError};

/// Floor of the retry schedule.
pub const DEFAULT_RETRY_MIN_DELAY: Duration = Duration::from_millis(500);
/// Cap of the retry schedule.
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Outcome of one attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RetryDecision<T, E> {
    /// The operation succeeded.
    Done(T),
    /// The operation failed transiently and may be attempted again.
    Retryable(E),
    /// The operation failed permanently.
    NonRetryable(E),
}

/// Timeout and cadence of a retry loop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    timeout: Duration,
    min_delay: Duration,
    max_delay: Duration,
    growth: u32,
    jitter_percent: u32,
}

impl RetryPolicy {
    /// Policy with the default cadence: 500 ms, doubling, capped at 10 s,
    /// with 10% jitter.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            min_delay: DEFAULT_RETRY_MIN_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
            growth: 2,
            jitter_percent: crate::wait::DEFAULT_JITTER_PERCENT,
        }
    }

    /// Sets the first delay.
    #[must_use]
    pub const fn with_min_delay(mut self, value: Duration) -> Self {
        self.min_delay = value;
        self
    }

    /// Sets the cap on the delay.
    #[must_use]
    pub const fn with_max_delay(mut self, value: Duration) -> Self {
        self.max_delay = value;
        self
    }

    /// Sets the factor applied to the delay after each attempt.
    #[must_use]
    pub const fn with_growth(mut self, value: u32) -> Self {
        self.growth = value;
        self
    }

    /// Sets the jitter percentage.
    #[must_use]
    pub const fn with_jitter_percent(mut self, value: u32) -> Self {
        self.jitter_percent = value;
        self
    }

    /// Overall time budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::NonRetryable`] after the first permanent
    /// failure and [`RetryError::TimedOut`] with the final attempt's error
    /// once the timeout elapses.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RetryDecision<T, E>>,
        E: std::error::Error + 'static,
    {
        self.drive(op, None).await
    }

    /// Like [`RetryPolicy::run`], but stops as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`RetryPolicy::run`]; additionally returns [`RetryError::Canceled`].
    pub async fn run_with_cancel<T, E, F, Fut>(
        &self,
        op: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RetryDecision<T, E>>,
        E: std::error::Error + 'static,
    {
        self.drive(op, Some(cancel)).await
    }

    async fn drive<T, E, F, Fut>(
        &self,
        mut op: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RetryDecision<T, E>>,
        E: std::error::Error + 'static,
    {
        let deadline = Instant::now() + self.timeout;
        let mut schedule = Backoff::exponential(self.min_delay, self.growth, self.max_delay)
            .with_jitter_percent(self.jitter_percent);
        let mut attempts: u32 = 0;
        let mut last_error = None;

        loop {
            let Some(decision) = until_cancelled(cancel, op()).await else {
                return Err(RetryError::Canceled {
                    attempts,
                    last_error,
                });
            };
            attempts = attempts.saturating_add(1);

            let err = match decision {
                RetryDecision::Done(value) => return Ok(value),
                RetryDecision::NonRetryable(err) => {
                    debug!(attempt = attempts, error = %err, "operation failed permanently");
                    return Err(RetryError::NonRetryable(err));
                }
                RetryDecision::Retryable(err) => err,
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(attempts, timeout = ?self.timeout, error = %err, "retry budget exhausted");
                return Err(RetryError::TimedOut {
                    timeout: self.timeout,
                    attempts,
                    last_error: err,
                });
            }

            let delay = schedule.next_delay().min(remaining);
            log_retry(attempts, delay, &err);
            last_error = Some(err);
            if until_cancelled(cancel, sleep(delay)).await.is_none() {
                return Err(RetryError::Canceled {
                    attempts,
                    last_error,
                });
            }
        }
    }
}

fn log_retry(attempt: u32, delay: Duration, err: &impl Display) {
    debug!(attempt, next_delay = ?delay, error = %err, "retrying operation");
}

/// Runs `op` with the default cadence and the given timeout.
///
/// # Errors
///
/// See [`RetryPolicy::run`].
pub async fn retry<T, E, F, Fut>(timeout: Duration, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryDecision<T, E>>,
    E: std::error::Error + 'static,
{
    RetryPolicy::new(timeout).run(op).await
}

/// Retries a plain fallible operation while `predicate` accepts its error.
/// Errors the predicate rejects are returned after that attempt.
///
/// # Errors
///
/// See [`RetryPolicy::run`].
pub async fn retry_when<T, E, F, Fut, P>(
    timeout: Duration,
    mut op: F,
    predicate: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::error::Error + 'static,
{
    let accepts = &predicate;
    retry(timeout, move || {
        let attempt = op();
        async move {
            match attempt.await {
                Ok(value) => RetryDecision::Done(value),
                Err(err) if accepts(&err) => RetryDecision::Retryable(err),
                Err(err) => RetryDecision::NonRetryable(err),
            }
        }
    })
    .await
}

/// Retries while the error classifies as not found, which is how a freshly
/// created dependency usually looks to a second API.
///
/// # Errors
///
/// See [`RetryPolicy::run`].
pub async fn retry_when_not_found<T, E, F, Fut>(
    timeout: Duration,
    op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + Classify + 'static,
{
    retry_when(timeout, op, |err: &E| err.is_not_found()).await
}

/// Retries not-found errors only while `is_new` holds. Reads of a resource
/// created in this run may lag; for anything older, not found is final.
///
/// # Errors
///
/// See [`RetryPolicy::run`].
pub async fn retry_when_new_resource_not_found<T, E, F, Fut>(
    timeout: Duration,
    is_new: bool,
    op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + Classify + 'static,
{
    retry_when(timeout, op, move |err: &E| is_new && err.is_not_found()).await
}

/// Repeats a lookup until it reports not found. A successful lookup means
/// the entity still exists and is retried; any other error is final.
///
/// # Errors
///
/// Returns [`RetryError::TimedOut`] carrying [`AbsenceError::StillExists`]
/// when the entity outlives the budget, and [`RetryError::NonRetryable`]
/// carrying [`AbsenceError::Lookup`] when the lookup fails otherwise.
pub async fn retry_until_not_found<T, E, F, Fut>(
    timeout: Duration,
    mut op: F,
) -> Result<(), RetryError<AbsenceError<E>>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + Classify + 'static,
{
    retry(timeout, move || {
        let attempt = op();
        async move {
            match attempt.await {
                Ok(_) => RetryDecision::Retryable(AbsenceError::StillExists),
                Err(err) if err.is_not_found() => RetryDecision::Done(()),
                Err(err) => RetryDecision::NonRetryable(AbsenceError::Lookup(err)),
            }
        }
    })
    .await
}
