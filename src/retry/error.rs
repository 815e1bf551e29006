//! Errors raised by the retry wrapper.

use std::time::Duration;

use thiserror::Error;

use crate::error::{Classify, ErrorKind};

/// Failures of a retry loop.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The operation reported a permanent failure.
    #[error(transparent)]
    NonRetryable(E),
    /// The budget ran out; carries the error of the final attempt.
    #[error("timeout after {attempts} attempts ({timeout:?}): {last_error}")]
    TimedOut {
        /// Configured budget.
        timeout: Duration,
        /// Attempts made, the last one at the deadline.
        attempts: u32,
        /// Error of the final attempt.
        #[source]
        last_error: E,
    },
    /// The caller cancelled the loop.
    #[error("retry canceled after {attempts} attempts")]
    Canceled {
        /// Attempts completed before cancellation.
        attempts: u32,
        /// Error of the last completed attempt, if any.
        last_error: Option<E>,
    },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Returns the error of the last attempt, if one completed.
    #[must_use]
    pub const fn last_error(&self) -> Option<&E> {
        match self {
            Self::NonRetryable(err) | Self::TimedOut { last_error: err, .. } => Some(err),
            Self::Canceled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Unwraps to the last attempt's error, dropping the retry context.
    #[must_use]
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::NonRetryable(err) | Self::TimedOut { last_error: err, .. } => Some(err),
            Self::Canceled { last_error, .. } => last_error,
        }
    }
}

impl<E> Classify for RetryError<E>
where
    E: std::error::Error + Classify + 'static,
{
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NonRetryable(err) => err.kind(),
            Self::TimedOut { .. } => ErrorKind::TimedOut,
            Self::Canceled { .. } => ErrorKind::Canceled,
        }
    }
}

/// Attempt error of [`super::retry_until_not_found`].
#[derive(Debug, Error)]
pub enum AbsenceError<E>
where
    E: std::error::Error + 'static,
{
    /// The entity was still found on the last attempt.
    #[error("resource still exists")]
    StillExists,
    /// The lookup failed with something other than not found.
    #[error(transparent)]
    Lookup(E),
}

impl<E> Classify for AbsenceError<E>
where
    E: std::error::Error + Classify + 'static,
{
    fn kind(&self) -> ErrorKind {
        match self {
            Self::StillExists => ErrorKind::UnexpectedState,
            Self::Lookup(err) => err.kind(),
        }
    }
}
