//! Composite resource identifiers.
//!
//! Many resources are keyed by more than one remote identifier (a route is
//! addressed by its route table and destination, an association by both
//! ends). The codec packs those parts into the single opaque string the
//! caller persists, and parses them back on every later read, update, or
//! delete.

use thiserror::Error;

use crate::error::{Classify, ErrorKind};

/// Separator used by [`encode_id`] and [`decode_id`].
pub const DEFAULT_SEPARATOR: char = ',';

/// Errors raised while encoding or decoding a composite identifier.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum IdError {
    /// Raised when a part cannot be encoded.
    #[error("invalid identifier part {index}: {reason}")]
    InvalidArgument {
        /// Zero-based position of the offending part.
        index: usize,
        /// Why the part was rejected.
        reason: String,
    },
    /// Raised when a stored identifier does not have the expected shape.
    #[error(
        "unexpected format for ID ({id}), expected {expected} non-empty parts separated by '{separator}'"
    )]
    MalformedId {
        /// The identifier as stored.
        id: String,
        /// Number of parts the caller expected.
        expected: usize,
        /// Separator used for the split.
        separator: char,
    },
}

impl Classify for IdError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::MalformedId { .. } => ErrorKind::MalformedId,
        }
    }
}

/// Encodes and decodes identifiers joined by a single separator character.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IdCodec {
    separator: char,
}

impl Default for IdCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl IdCodec {
    /// Creates a codec for the given separator.
    #[must_use]
    pub const fn new(separator: char) -> Self {
        Self { separator }
    }

    /// Separator this codec joins on.
    #[must_use]
    pub const fn separator(&self) -> char {
        self.separator
    }

    /// Joins `parts` into one identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidArgument`] when no parts are given, or when
    /// any part is empty or contains the separator.
    pub fn encode<I, P>(&self, parts: I) -> Result<String, IdError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut id = String::new();
        let mut count = 0_usize;
        for (index, part) in parts.into_iter().enumerate() {
            let value = part.as_ref();
            if value.is_empty() {
                return Err(IdError::InvalidArgument {
                    index,
                    reason: String::from("part is empty"),
                });
            }
            if value.contains(self.separator) {
                return Err(IdError::InvalidArgument {
                    index,
                    reason: format!("part contains separator '{}'", self.separator),
                });
            }
            if index > 0 {
                id.push(self.separator);
            }
            id.push_str(value);
            count += 1;
        }

        if count == 0 {
            return Err(IdError::InvalidArgument {
                index: 0,
                reason: String::from("at least one part is required"),
            });
        }
        Ok(id)
    }

    /// Splits `id` into exactly `arity` non-empty parts.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::MalformedId`] when the part count differs from
    /// `arity` or any part is empty.
    pub fn decode(&self, id: &str, arity: usize) -> Result<Vec<String>, IdError> {
        let parts: Vec<String> = id.split(self.separator).map(str::to_owned).collect();
        if arity == 0 || parts.len() != arity || parts.iter().any(String::is_empty) {
            return Err(self.malformed(id, arity));
        }
        Ok(parts)
    }

    /// Decodes a two-part identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::MalformedId`] unless `id` has exactly two parts.
    pub fn decode_pair(&self, id: &str) -> Result<(String, String), IdError> {
        let mut parts = self.decode(id, 2)?.into_iter();
        match (parts.next(), parts.next()) {
            (Some(first), Some(second)) => Ok((first, second)),
            _ => Err(self.malformed(id, 2)),
        }
    }

    /// Decodes a three-part identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::MalformedId`] unless `id` has exactly three parts.
    pub fn decode_triple(&self, id: &str) -> Result<(String, String, String), IdError> {
        let mut parts = self.decode(id, 3)?.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(first), Some(second), Some(third)) => Ok((first, second, third)),
            _ => Err(self.malformed(id, 3)),
        }
    }

    fn malformed(&self, id: &str, expected: usize) -> IdError {
        IdError::MalformedId {
            id: id.to_owned(),
            expected,
            separator: self.separator,
        }
    }
}

/// Encodes `parts` with [`DEFAULT_SEPARATOR`].
///
/// # Errors
///
/// See [`IdCodec::encode`].
pub fn encode_id<I, P>(parts: I) -> Result<String, IdError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    IdCodec::default().encode(parts)
}

/// Decodes `id` with [`DEFAULT_SEPARATOR`].
///
/// # Errors
///
/// See [`IdCodec::decode`].
pub fn decode_id(id: &str, arity: usize) -> Result<Vec<String>, IdError> {
    IdCodec::default().decode(id, arity)
}
