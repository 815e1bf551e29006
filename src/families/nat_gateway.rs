//! NAT gateways.
//!
//! Deleted gateways stay visible with state `deleted` for about an hour, so
//! probes should build observations with [`observe`], which folds that state
//! into not found.

use std::time::Duration;

use crate::observation::Observation;
use crate::wait::{SpecError, WaitSpec};

/// Provisioning.
pub const PENDING: &str = "pending";
/// Ready for traffic.
pub const AVAILABLE: &str = "available";
/// Delete in progress.
pub const DELETING: &str = "deleting";
/// Deleted; treated as absent.
pub const DELETED: &str = "deleted";
/// Provisioning failed.
pub const FAILED: &str = "failed";

/// Pause before the first probe of a delete wait.
pub const DELETE_DELAY: Duration = Duration::from_secs(10);
/// Floor of the delete poll interval.
pub const DELETE_MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Builds the observation for a gateway reporting `state`.
#[must_use]
pub fn observe<T>(object: T, state: &str) -> Observation<T, String> {
    if state == DELETED {
        return Observation::NotFound;
    }
    Observation::from_label(object, state.to_owned())
}

/// Waits for a new gateway to become available. A `failed` gateway ends the
/// wait with an unexpected-state error instead of running out the clock.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn created(timeout: Duration) -> Result<WaitSpec<String>, SpecError> {
    WaitSpec::until([String::from(AVAILABLE)], timeout)
        .pending([String::from(PENDING)])
        .strict_pending(true)
        .build()
}

/// Waits for a deleted gateway to disappear.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn deleted(timeout: Duration) -> Result<WaitSpec<String>, SpecError> {
    WaitSpec::until_gone(timeout)
        .pending([String::from(DELETING)])
        .delay(DELETE_DELAY)
        .min_poll_interval(DELETE_MIN_POLL_INTERVAL)
        .build()
}
