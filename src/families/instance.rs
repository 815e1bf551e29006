//! Compute instances.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::wait::{SpecError, WaitSpec};

/// Pause before the first probe of any instance wait.
pub const INSTANCE_DELAY: Duration = Duration::from_secs(10);
/// Floor of the instance poll interval.
pub const INSTANCE_MIN_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Lifecycle state reported for an instance.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InstanceState {
    /// Launching.
    Pending,
    /// Up and running.
    Running,
    /// Terminating.
    ShuttingDown,
    /// Gone for good; still visible to describe calls for a while.
    Terminated,
    /// Stopping.
    Stopping,
    /// Stopped and restartable.
    Stopped,
}

impl InstanceState {
    /// Wire label used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when the API reports a state outside [`InstanceState`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown instance state '{0}'")]
pub struct UnknownInstanceState(pub String);

impl FromStr for InstanceState {
    type Err = UnknownInstanceState;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "shutting-down" => Ok(Self::ShuttingDown),
            "terminated" => Ok(Self::Terminated),
            "stopping" => Ok(Self::Stopping),
            "stopped" => Ok(Self::Stopped),
            other => Err(UnknownInstanceState(other.to_owned())),
        }
    }
}

fn spec<const P: usize, const T: usize>(
    pending: [InstanceState; P],
    target: [InstanceState; T],
    timeout: Duration,
) -> Result<WaitSpec<InstanceState>, SpecError> {
    WaitSpec::until(target, timeout)
        .pending(pending)
        .delay(INSTANCE_DELAY)
        .min_poll_interval(INSTANCE_MIN_POLL_INTERVAL)
        .build()
}

/// Waits for a freshly launched instance to run.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn created(timeout: Duration) -> Result<WaitSpec<InstanceState>, SpecError> {
    spec([InstanceState::Pending], [InstanceState::Running], timeout)
}

/// Waits for the instance to settle as either running or stopped.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn ready(timeout: Duration) -> Result<WaitSpec<InstanceState>, SpecError> {
    spec(
        [InstanceState::Pending, InstanceState::Stopping],
        [InstanceState::Running, InstanceState::Stopped],
        timeout,
    )
}

/// Waits for a stopped instance to start.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn started(timeout: Duration) -> Result<WaitSpec<InstanceState>, SpecError> {
    spec(
        [InstanceState::Pending, InstanceState::Stopped],
        [InstanceState::Running],
        timeout,
    )
}

/// Waits for the instance to stop.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn stopped(timeout: Duration) -> Result<WaitSpec<InstanceState>, SpecError> {
    spec(
        [
            InstanceState::Pending,
            InstanceState::Running,
            InstanceState::ShuttingDown,
            InstanceState::Stopping,
        ],
        [InstanceState::Stopped],
        timeout,
    )
}

/// Waits for the instance to terminate. Terminated instances linger in
/// describe output, so the target is a state rather than absence.
///
/// # Errors
///
/// Returns [`SpecError`] when `timeout` is zero.
pub fn terminated(timeout: Duration) -> Result<WaitSpec<InstanceState>, SpecError> {
    spec(
        [
            InstanceState::Pending,
            InstanceState::Running,
            InstanceState::ShuttingDown,
            InstanceState::Stopping,
            InstanceState::Stopped,
        ],
        [InstanceState::Terminated],
        timeout,
    )
}
