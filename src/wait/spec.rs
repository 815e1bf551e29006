//! Per-call wait configuration.

use std::time::Duration;

use thiserror::Error;

use crate::backoff::Backoff;
use crate::observation::StatusLabel;

/// Default number of consecutive not-found probes tolerated.
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;
/// Default first poll interval.
pub const DEFAULT_MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default cap on the poll interval.
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default factor applied to the poll interval after each probe.
pub const DEFAULT_POLL_INTERVAL_GROWTH: u32 = 2;
/// Default jitter, as a percentage of each poll interval.
pub const DEFAULT_JITTER_PERCENT: u32 = 10;

/// Errors raised when a [`WaitSpecBuilder`] holds unusable values.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SpecError {
    /// Raised when a field is zero or otherwise out of range.
    #[error("invalid wait specification: {0}")]
    Validation(String),
}

/// Configuration for one wait.
///
/// Built fresh for every create, update, or delete and dropped when the wait
/// returns. An empty target means the wait succeeds once the entity is gone.
#[derive(Clone, Debug, PartialEq)]
pub struct WaitSpec<S> {
    pub(crate) pending: Vec<S>,
    pub(crate) target: Vec<S>,
    pub(crate) timeout: Duration,
    pub(crate) delay: Duration,
    pub(crate) min_poll_interval: Duration,
    pub(crate) max_poll_interval: Duration,
    pub(crate) poll_interval_growth: u32,
    pub(crate) poll_interval: Option<Duration>,
    pub(crate) jitter_percent: u32,
    pub(crate) not_found_checks: u32,
    pub(crate) continuous_target_occurrence: u32,
    pub(crate) strict_pending: bool,
}

impl<S: StatusLabel> WaitSpec<S> {
    /// Starts a spec that succeeds once the status is one of `target`.
    #[must_use]
    pub fn until<I>(target: I, timeout: Duration) -> WaitSpecBuilder<S>
    where
        I: IntoIterator<Item = S>,
    {
        WaitSpecBuilder::new(target.into_iter().collect(), timeout)
    }

    /// Starts a spec that succeeds once the entity can no longer be found.
    #[must_use]
    pub fn until_gone(timeout: Duration) -> WaitSpecBuilder<S> {
        WaitSpecBuilder::new(Vec::new(), timeout)
    }

    /// Statuses considered in progress.
    #[must_use]
    pub fn pending(&self) -> &[S] {
        &self.pending
    }

    /// Statuses that count as success. Empty means "gone".
    #[must_use]
    pub fn target(&self) -> &[S] {
        &self.target
    }

    /// Returns `true` when absence is the success condition.
    #[must_use]
    pub fn waits_for_absence(&self) -> bool {
        self.target.is_empty()
    }

    /// Overall deadline, measured from the start of the wait.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Consecutive not-found probes tolerated before failing.
    #[must_use]
    pub const fn not_found_checks(&self) -> u32 {
        self.not_found_checks
    }

    /// Consecutive target observations required for success.
    #[must_use]
    pub const fn continuous_target_occurrence(&self) -> u32 {
        self.continuous_target_occurrence
    }

    pub(crate) fn schedule(&self) -> Backoff {
        let backoff = self.poll_interval.map_or_else(
            || {
                Backoff::exponential(
                    self.min_poll_interval,
                    self.poll_interval_growth,
                    self.max_poll_interval,
                )
            },
            Backoff::fixed,
        );
        backoff.with_jitter_percent(self.jitter_percent)
    }

    pub(crate) fn is_target(&self, status: &S) -> bool {
        self.target.contains(status)
    }

    pub(crate) fn is_expected(&self, status: &S) -> bool {
        !self.strict_pending || self.pending.contains(status) || self.target.contains(status)
    }

    pub(crate) fn describe_target(&self) -> String {
        if self.target.is_empty() {
            return String::from("[gone]");
        }
        render_states(&self.target)
    }
}

pub(crate) fn render_states<S: StatusLabel>(states: &[S]) -> String {
    let labels: Vec<String> = states.iter().map(ToString::to_string).collect();
    format!("[{}]", labels.join(", "))
}

/// Builder for [`WaitSpec`] that validates on [`WaitSpecBuilder::build`].
#[derive(Clone, Debug, PartialEq)]
pub struct WaitSpecBuilder<S> {
    spec: WaitSpec<S>,
}

impl<S: StatusLabel> WaitSpecBuilder<S> {
    fn new(target: Vec<S>, timeout: Duration) -> Self {
        Self {
            spec: WaitSpec {
                pending: Vec::new(),
                target,
                timeout,
                delay: Duration::ZERO,
                min_poll_interval: DEFAULT_MIN_POLL_INTERVAL,
                max_poll_interval: DEFAULT_MAX_POLL_INTERVAL,
                poll_interval_growth: DEFAULT_POLL_INTERVAL_GROWTH,
                poll_interval: None,
                jitter_percent: DEFAULT_JITTER_PERCENT,
                not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
                continuous_target_occurrence: 1,
                strict_pending: false,
            },
        }
    }

    /// Sets the statuses considered in progress.
    #[must_use]
    pub fn pending<I>(mut self, pending: I) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        self.spec.pending = pending.into_iter().collect();
        self
    }

    /// Sets the overall deadline.
    #[must_use]
    pub const fn timeout(mut self, value: Duration) -> Self {
        self.spec.timeout = value;
        self
    }

    /// Sets the pause before the first probe.
    #[must_use]
    pub const fn delay(mut self, value: Duration) -> Self {
        self.spec.delay = value;
        self
    }

    /// Sets the first (and smallest) poll interval.
    #[must_use]
    pub const fn min_poll_interval(mut self, value: Duration) -> Self {
        self.spec.min_poll_interval = value;
        self
    }

    /// Sets the cap on the poll interval.
    #[must_use]
    pub const fn max_poll_interval(mut self, value: Duration) -> Self {
        self.spec.max_poll_interval = value;
        self
    }

    /// Sets the factor applied to the interval after each probe.
    #[must_use]
    pub const fn poll_interval_growth(mut self, value: u32) -> Self {
        self.spec.poll_interval_growth = value;
        self
    }

    /// Polls at a constant interval instead of backing off.
    #[must_use]
    pub const fn poll_interval(mut self, value: Duration) -> Self {
        self.spec.poll_interval = Some(value);
        self
    }

    /// Sets the jitter percentage added to each interval.
    #[must_use]
    pub const fn jitter_percent(mut self, value: u32) -> Self {
        self.spec.jitter_percent = value;
        self
    }

    /// Sets how many consecutive not-found probes are tolerated.
    #[must_use]
    pub const fn not_found_checks(mut self, value: u32) -> Self {
        self.spec.not_found_checks = value;
        self
    }

    /// Sets how many consecutive target observations are required.
    #[must_use]
    pub const fn continuous_target_occurrence(mut self, value: u32) -> Self {
        self.spec.continuous_target_occurrence = value;
        self
    }

    /// Fails the wait on any status outside `pending` and `target`.
    #[must_use]
    pub const fn strict_pending(mut self, value: bool) -> Self {
        self.spec.strict_pending = value;
        self
    }

    /// Validates and returns the spec.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Validation`] when the timeout or a poll interval
    /// is zero, the interval bounds are inverted, the growth factor or
    /// required target occurrence is zero, or strict mode is requested
    /// without pending statuses.
    pub fn build(self) -> Result<WaitSpec<S>, SpecError> {
        let spec = self.spec;
        if spec.timeout.is_zero() {
            return Err(SpecError::Validation(String::from(
                "timeout must be greater than zero",
            )));
        }
        if spec.min_poll_interval.is_zero() {
            return Err(SpecError::Validation(String::from(
                "min_poll_interval must be greater than zero",
            )));
        }
        if spec.poll_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(SpecError::Validation(String::from(
                "poll_interval must be greater than zero",
            )));
        }
        if spec.min_poll_interval > spec.max_poll_interval {
            return Err(SpecError::Validation(format!(
                "min_poll_interval ({:?}) exceeds max_poll_interval ({:?})",
                spec.min_poll_interval, spec.max_poll_interval
            )));
        }
        if spec.poll_interval_growth == 0 {
            return Err(SpecError::Validation(String::from(
                "poll_interval_growth must be at least 1",
            )));
        }
        if spec.continuous_target_occurrence == 0 {
            return Err(SpecError::Validation(String::from(
                "continuous_target_occurrence must be at least 1",
            )));
        }
        if spec.strict_pending && spec.pending.is_empty() {
            return Err(SpecError::Validation(String::from(
                "strict_pending requires at least one pending status",
            )));
        }
        Ok(spec)
    }
}
