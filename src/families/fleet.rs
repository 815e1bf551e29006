//! Instance fleets.

use std::time::Duration;

use crate::wait::{SpecError, WaitSpec};

/// Request accepted, instances not yet launched.
pub const SUBMITTED: &str = "submitted";
/// Fleet is running.
pub const ACTIVE: &str = "active";
/// Modification in progress.
pub const MODIFYING: &str = "modifying";
/// Fleet and its instances are gone.
pub const DELETED: &str = "deleted";
/// Fleet deleted, instances left running, as spelled by the SDK.
pub const DELETED_RUNNING: &str = "deleted-running";
/// Fleet deleted, instances left running, as actually reported by the API.
/// The two spellings disagree, so targets carry both.
pub const DELETED_RUNNING_REPORTED: &str = "deleted_running";
/// Fleet deleted, instances terminating.
pub const DELETED_TERMINATING: &str = "deleted_terminating";

/// Floor of every fleet poll interval.
pub const FLEET_MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Pause before polling the delete of a fleet that terminates its instances.
pub const TERMINATE_INSTANCES_DELAY: Duration = Duration::from_secs(300);

/// How the fleet was requested.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FleetType {
    /// Keeps target capacity by replacing interrupted instances.
    Maintain,
    /// One-time request; may finish and delete itself right away.
    Request,
    /// Synchronous launch; its state takes up to two days to settle.
    Instant,
}

fn states<const N: usize>(labels: [&str; N]) -> Vec<String> {
    labels.into_iter().map(str::to_owned).collect()
}

/// Waits for a new fleet to become active. Request fleets can be fulfilled
/// and deleted before the first probe, so every deleted state counts as
/// success for them.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn created(timeout: Duration, fleet_type: FleetType) -> Result<WaitSpec<String>, SpecError> {
    let mut target = states([ACTIVE]);
    if fleet_type == FleetType::Request {
        target.extend(states([
            DELETED,
            DELETED_RUNNING,
            DELETED_RUNNING_REPORTED,
            DELETED_TERMINATING,
        ]));
    }
    WaitSpec::until(target, timeout)
        .pending(states([SUBMITTED]))
        .min_poll_interval(FLEET_MIN_POLL_INTERVAL)
        .build()
}

/// Waits for a modified fleet to return to active.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn modified(timeout: Duration) -> Result<WaitSpec<String>, SpecError> {
    WaitSpec::until(states([ACTIVE]), timeout)
        .pending(states([MODIFYING]))
        .min_poll_interval(FLEET_MIN_POLL_INTERVAL)
        .build()
}

/// Waits for a deleted fleet to settle. Instant fleets are not waited on
/// and yield `None`.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn deleted(
    timeout: Duration,
    fleet_type: FleetType,
    terminate_instances: bool,
) -> Result<Option<WaitSpec<String>>, SpecError> {
    if fleet_type == FleetType::Instant {
        return Ok(None);
    }

    let mut pending = states([ACTIVE]);
    let mut target = states([DELETED]);
    let mut delay = Duration::ZERO;
    if terminate_instances {
        pending.extend(states([DELETED_TERMINATING]));
        delay = TERMINATE_INSTANCES_DELAY;
    } else {
        target.extend(states([DELETED_RUNNING, DELETED_RUNNING_REPORTED]));
    }

    WaitSpec::until(target, timeout)
        .pending(pending)
        .delay(delay)
        .min_poll_interval(FLEET_MIN_POLL_INTERVAL)
        .build()
        .map(Some)
}
