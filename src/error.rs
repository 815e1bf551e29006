//! Error classification shared by every component.
//!
//! Each component owns its own error enum. [`Classify`] maps them onto one
//! coarse [`ErrorKind`] so resource drivers can branch on "absent" or
//! "timed out" without matching every concrete variant.

use std::fmt;

/// Coarse category of a reconciliation failure.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// The entity is absent beyond the tolerated not-found budget.
    NotFound,
    /// A wait or retry exceeded its deadline.
    TimedOut,
    /// A composite identifier could not be parsed.
    MalformedId,
    /// A caller supplied an unusable argument.
    InvalidArgument,
    /// The caller cancelled the operation.
    Canceled,
    /// The remote entity reported a status outside the expected sets.
    UnexpectedState,
    /// The remote API or the refresh probe failed.
    Remote,
    /// Configuration could not be loaded or validated.
    Config,
}

impl ErrorKind {
    /// Short lowercase label, suitable for structured log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::TimedOut => "timed_out",
            Self::MalformedId => "malformed_id",
            Self::InvalidArgument => "invalid_argument",
            Self::Canceled => "canceled",
            Self::UnexpectedState => "unexpected_state",
            Self::Remote => "remote",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every error type in the crate, and by caller errors that
/// want to take part in not-found driven retries.
pub trait Classify {
    /// Returns the coarse category of this error.
    fn kind(&self) -> ErrorKind;

    /// Returns `true` when the error means the entity does not exist.
    fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns `true` when the error is a deadline expiry.
    fn is_timed_out(&self) -> bool {
        self.kind() == ErrorKind::TimedOut
    }
}
