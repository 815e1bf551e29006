//! Errors surfaced by the reconciliation driver.

use std::fmt::{self, Debug};

use thiserror::Error;

use crate::error::{Classify, ErrorKind};
use crate::wait::WaitError;

/// Lifecycle operation that was being reconciled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// Resource creation.
    Create,
    /// In-place update.
    Update,
    /// Deletion.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Errors raised while reconciling a resource.
#[derive(Debug, Error)]
pub enum ReconcileError<T, E>
where
    T: Debug,
    E: std::error::Error + 'static,
{
    /// Raised when the create call fails.
    #[error("failed to create resource: {0}")]
    Create(#[source] E),
    /// Raised when the describe call fails outside a wait.
    #[error("failed to read resource {id}: {source}")]
    Read {
        /// Resource identifier.
        id: String,
        /// Underlying API error.
        #[source]
        source: E,
    },
    /// Raised when the update call fails.
    #[error("failed to update resource {id}: {source}")]
    Update {
        /// Resource identifier.
        id: String,
        /// Underlying API error.
        #[source]
        source: E,
    },
    /// Raised when the delete call fails with anything but not-found.
    #[error("failed to delete resource {id}: {source}")]
    Delete {
        /// Resource identifier.
        id: String,
        /// Underlying API error.
        #[source]
        source: E,
    },
    /// Raised when waiting for the resource to settle fails.
    #[error("waiting for {operation} of resource {id}: {source}")]
    Wait {
        /// Operation whose wait failed.
        operation: Operation,
        /// Resource identifier.
        id: String,
        /// Underlying wait failure.
        #[source]
        source: WaitError<T, E>,
    },
    /// Raised when a wait that should yield an object ended with the
    /// resource gone.
    #[error("resource {id} disappeared during {operation}")]
    Vanished {
        /// Operation being reconciled.
        operation: Operation,
        /// Resource identifier.
        id: String,
    },
}

impl<T, E> Classify for ReconcileError<T, E>
where
    T: Debug,
    E: std::error::Error + Classify + 'static,
{
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Create(source)
            | Self::Read { source, .. }
            | Self::Update { source, .. }
            | Self::Delete { source, .. } => source.kind(),
            Self::Wait { source, .. } => match source {
                WaitError::Refresh(inner) => inner.kind(),
                other => other.kind(),
            },
            Self::Vanished { .. } => ErrorKind::NotFound,
        }
    }
}
