//! What a single refresh probe reports about a remote entity.

use std::fmt::{Debug, Display};
use std::future::Future;

/// Lifecycle label reported by the remote API.
///
/// There is no fixed vocabulary: each resource family uses its own string
/// constants or enum. Any cloneable, comparable, printable type qualifies.
pub trait StatusLabel: Clone + Debug + Display + PartialEq + Send + Sync + 'static {}

impl<S> StatusLabel for S where S: Clone + Debug + Display + PartialEq + Send + Sync + 'static {}

/// Result of one probe that did not fail.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Observation<T, S> {
    /// The entity exists and reports `status`.
    Found {
        /// Object returned by the describe call.
        object: T,
        /// Status extracted from the object.
        status: S,
    },
    /// The entity could not be found. Early in a resource's life this is
    /// usually read-after-write lag rather than real absence.
    NotFound,
}

impl<T, S> Observation<T, S> {
    /// Shorthand for [`Observation::Found`].
    #[must_use]
    pub const fn found(object: T, status: S) -> Self {
        Self::Found { object, status }
    }

    /// Returns the reported status, if the entity was found.
    #[must_use]
    pub const fn status(&self) -> Option<&S> {
        match self {
            Self::Found { status, .. } => Some(status),
            Self::NotFound => None,
        }
    }

    /// Returns `true` for [`Observation::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl<T, S> Observation<T, S>
where
    S: AsRef<str>,
{
    /// Builds an observation from a raw API status string. The empty label
    /// is reserved for "not found".
    #[must_use]
    pub fn from_label(object: T, label: S) -> Self {
        if label.as_ref().is_empty() {
            Self::NotFound
        } else {
            Self::Found {
                object,
                status: label,
            }
        }
    }
}

/// Outcome of one probe: an observation, or an error that aborts the wait.
pub type RefreshResult<T, S, E> = Result<Observation<T, S>, E>;

/// Asks the remote system for the current state of one entity.
///
/// Probes must not block or retry internally: a wait treats `Err` as fatal.
/// Wrap the probe with [`crate::retry`] first when transient read errors
/// should be tolerated. Implemented for every `FnMut` closure returning a
/// future of [`RefreshResult`].
pub trait Refresh {
    /// Object returned on success.
    type Object;
    /// Status vocabulary of the entity.
    type Status: StatusLabel;
    /// Error raised by the underlying API.
    type Error;

    /// Performs one probe.
    fn refresh(
        &mut self,
    ) -> impl Future<Output = RefreshResult<Self::Object, Self::Status, Self::Error>> + Send;
}

impl<F, Fut, T, S, E> Refresh for F
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RefreshResult<T, S, E>> + Send,
    S: StatusLabel,
{
    type Object = T;
    type Status = S;
    type Error = E;

    fn refresh(&mut self) -> impl Future<Output = RefreshResult<T, S, E>> + Send {
        self()
    }
}
