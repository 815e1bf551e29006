//! Routes in a route table.
//!
//! A route has no identifier of its own; it is addressed by its route table
//! and destination, packed into one composite ID. Routes report no status
//! either: a route that can be found is [`READY`].

use std::time::Duration;

use crate::id::{IdCodec, IdError, encode_id};
use crate::observation::Observation;
use crate::wait::{SpecError, WaitSpec};

/// Synthetic status of a route that exists.
pub const READY: &str = "ready";
/// Not-found budget for new routes. Large enough that only the timeout
/// ends a wait on a route still propagating.
pub const NOT_FOUND_CHECKS: u32 = 1000;

/// Builds the composite ID `route_table_id,destination`.
///
/// # Errors
///
/// Returns [`IdError::InvalidArgument`] when either part is empty or holds
/// the separator.
pub fn route_id(route_table_id: &str, destination: &str) -> Result<String, IdError> {
    encode_id([route_table_id, destination])
}

/// Splits a route ID into route table ID and destination.
///
/// # Errors
///
/// Returns [`IdError::MalformedId`] when `id` is not exactly two non-empty
/// parts.
pub fn parse_route_id(id: &str) -> Result<(String, String), IdError> {
    IdCodec::default().decode_pair(id)
}

/// Builds the observation for a route lookup.
#[must_use]
pub fn observe<T>(route: Option<T>) -> Observation<T, &'static str> {
    route.map_or(Observation::NotFound, |found| Observation::found(found, READY))
}

/// Waits for a new route to be visible on two consecutive reads.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn ready(timeout: Duration) -> Result<WaitSpec<&'static str>, SpecError> {
    WaitSpec::until([READY], timeout)
        .not_found_checks(NOT_FOUND_CHECKS)
        .continuous_target_occurrence(2)
        .build()
}

/// Waits for a deleted route to be absent on two consecutive reads.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn deleted(timeout: Duration) -> Result<WaitSpec<&'static str>, SpecError> {
    WaitSpec::until_gone(timeout)
        .pending([READY])
        .continuous_target_occurrence(2)
        .build()
}
