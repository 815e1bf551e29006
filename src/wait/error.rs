//! Errors raised by the state-change waiter.

use std::fmt::Debug;
use std::time::Duration;

use thiserror::Error;

use crate::error::{Classify, ErrorKind};

/// Terminal failures of a wait.
///
/// Status labels are rendered to strings so diagnostics stay readable
/// whatever vocabulary the resource family uses.
#[derive(Debug, Error)]
pub enum WaitError<T, E>
where
    T: Debug,
    E: std::error::Error + 'static,
{
    /// The refresh probe failed. Read errors are never retried by the waiter.
    #[error("refreshing state failed: {0}")]
    Refresh(#[source] E),
    /// The entity stayed absent for longer than the not-found budget.
    #[error("couldn't find resource ({checks} consecutive not-found checks)")]
    NotFound {
        /// Consecutive not-found probes observed.
        checks: u32,
    },
    /// The deadline passed before the target condition held.
    #[error(
        "timeout while waiting for state to become '{expected}' (last state: '{}', timeout: {timeout:?})",
        .last_status.as_deref().unwrap_or("not found")
    )]
    TimedOut {
        /// Configured deadline.
        timeout: Duration,
        /// Target statuses, rendered.
        expected: String,
        /// Last status observed, if the entity was ever found.
        last_status: Option<String>,
        /// Last object observed, for diagnostics.
        last_object: Option<T>,
        /// Number of probes performed.
        polls: u32,
    },
    /// Strict mode observed a status outside the pending and target sets.
    #[error("unexpected state '{status}', wanted target '{expected}'")]
    UnexpectedState {
        /// Status observed.
        status: String,
        /// Target statuses, rendered.
        expected: String,
        /// Object carrying the unexpected status.
        object: T,
    },
    /// The caller cancelled the wait.
    #[error("wait canceled after {polls} polls")]
    Canceled {
        /// Number of probes performed before cancellation.
        polls: u32,
    },
}

impl<T, E> WaitError<T, E>
where
    T: Debug,
    E: std::error::Error + 'static,
{
    /// Returns the last object seen before a timeout or unexpected state.
    #[must_use]
    pub const fn last_object(&self) -> Option<&T> {
        match self {
            Self::TimedOut { last_object, .. } => last_object.as_ref(),
            Self::UnexpectedState { object, .. } => Some(object),
            Self::Refresh(_) | Self::NotFound { .. } | Self::Canceled { .. } => None,
        }
    }
}

impl<T, E> Classify for WaitError<T, E>
where
    T: Debug,
    E: std::error::Error + 'static,
{
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Refresh(_) => ErrorKind::Remote,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
            Self::UnexpectedState { .. } => ErrorKind::UnexpectedState,
            Self::Canceled { .. } => ErrorKind::Canceled,
        }
    }
}
