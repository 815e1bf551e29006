//! State-change waiter.
//!
//! Polls a [`Refresh`] probe until the reported status settles in the
//! target set, tolerating read-after-write lag (not-found hysteresis) and
//! status flapping (continuous target occurrence). The wait suspends only
//! the calling task and holds no shared state.

mod error;
mod spec;
mod tracker;

use std::fmt::Debug;
use std::future::Future;

use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::observation::Refresh;
use tracker::{Tracker, Transition};

pub use error::WaitError;
pub use spec::{
    DEFAULT_JITTER_PERCENT, DEFAULT_MAX_POLL_INTERVAL, DEFAULT_MIN_POLL_INTERVAL,
    DEFAULT_NOT_FOUND_CHECKS, DEFAULT_POLL_INTERVAL_GROWTH, SpecError, WaitSpec, WaitSpecBuilder,
};

/// Result of a wait: the last observed object, or `None` when the target was
/// the entity's absence.
pub type WaitResult<R> =
    Result<Option<<R as Refresh>::Object>, WaitError<<R as Refresh>::Object, <R as Refresh>::Error>>;

/// Polls `refresh` until `spec` is satisfied.
///
/// # Errors
///
/// Returns [`WaitError::Refresh`] on the first probe error,
/// [`WaitError::NotFound`] when the entity stays absent beyond the
/// not-found budget, [`WaitError::UnexpectedState`] in strict mode, and
/// [`WaitError::TimedOut`] once the deadline passes.
pub async fn wait_for_state<R>(spec: &WaitSpec<R::Status>, refresh: R) -> WaitResult<R>
where
    R: Refresh,
    R::Object: Debug,
    R::Error: std::error::Error + 'static,
{
    poll(spec, refresh, None).await
}

/// Like [`wait_for_state`], but aborts with [`WaitError::Canceled`] as soon
/// as `cancel` fires.
///
/// # Errors
///
/// See [`wait_for_state`]; additionally returns [`WaitError::Canceled`].
pub async fn wait_for_state_with_cancel<R>(
    spec: &WaitSpec<R::Status>,
    refresh: R,
    cancel: &CancellationToken,
) -> WaitResult<R>
where
    R: Refresh,
    R::Object: Debug,
    R::Error: std::error::Error + 'static,
{
    poll(spec, refresh, Some(cancel)).await
}

async fn poll<R>(
    spec: &WaitSpec<R::Status>,
    mut refresh: R,
    cancel: Option<&CancellationToken>,
) -> WaitResult<R>
where
    R: Refresh,
    R::Object: Debug,
    R::Error: std::error::Error + 'static,
{
    let deadline = Instant::now() + spec.timeout;
    let mut schedule = spec.schedule();
    let mut tracker = Tracker::new(spec);
    let mut last_object = None;
    let mut pause = spec.delay;

    loop {
        let nap = pause.min(deadline.saturating_duration_since(Instant::now()));
        if until_cancelled(cancel, sleep(nap)).await.is_none() {
            return Err(canceled(&tracker));
        }

        let Some(probed) = until_cancelled(cancel, timeout_at(deadline, refresh.refresh())).await
        else {
            return Err(canceled(&tracker));
        };
        let Ok(refreshed) = probed else {
            warn!(polls = tracker.polls(), "refresh probe outlived the wait deadline");
            return Err(timed_out(spec, &tracker, last_object));
        };
        let observation = refreshed.map_err(WaitError::Refresh)?;
        let label = observation.status().map(ToString::to_string);

        match tracker.observe(observation) {
            Transition::Succeeded(object) => {
                debug!(
                    polls = tracker.polls(),
                    status = label.as_deref().unwrap_or("gone"),
                    "target state reached"
                );
                return Ok(object);
            }
            Transition::NotFound { checks } => {
                warn!(checks, "resource not found beyond tolerated checks");
                return Err(WaitError::NotFound { checks });
            }
            Transition::Unexpected(object) => {
                return Err(WaitError::UnexpectedState {
                    status: label.unwrap_or_default(),
                    expected: spec.describe_target(),
                    object,
                });
            }
            Transition::Polling(object) => {
                debug!(
                    polls = tracker.polls(),
                    status = label.as_deref().unwrap_or("not found"),
                    "waiting for target state"
                );
                // Kept in step with the tracker's last status.
                last_object = object;
            }
        }

        if Instant::now() >= deadline {
            warn!(
                polls = tracker.polls(),
                timeout = ?spec.timeout,
                "wait deadline exceeded"
            );
            return Err(timed_out(spec, &tracker, last_object));
        }
        pause = schedule.next_delay();
    }
}

/// Resolves `future`, or returns `None` if `cancel` fires first.
pub(crate) async fn until_cancelled<F: Future>(
    cancel: Option<&CancellationToken>,
    future: F,
) -> Option<F::Output> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => None,
            output = future => Some(output),
        },
        None => Some(future.await),
    }
}

fn canceled<T, E, S>(tracker: &Tracker<'_, S>) -> WaitError<T, E>
where
    T: Debug,
    E: std::error::Error + 'static,
    S: crate::observation::StatusLabel,
{
    WaitError::Canceled {
        polls: tracker.polls(),
    }
}

fn timed_out<T, E, S>(
    spec: &WaitSpec<S>,
    tracker: &Tracker<'_, S>,
    last_object: Option<T>,
) -> WaitError<T, E>
where
    T: Debug,
    E: std::error::Error + 'static,
    S: crate::observation::StatusLabel,
{
    WaitError::TimedOut {
        timeout: spec.timeout,
        expected: spec.describe_target(),
        last_status: tracker.last_status().map(ToString::to_string),
        last_object,
        polls: tracker.polls(),
    }
}
