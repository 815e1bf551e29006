//! Poll and retry cadence.
//!
//! Intervals start at a floor, grow by an integer factor after every step,
//! stop growing at a cap, and carry a bounded random jitter so concurrent
//! waits against the same API drift apart.

use std::time::Duration;

use rand::Rng;

/// Smallest delay a schedule yields. Zero inputs are raised to it so a
/// schedule always grows and never spins.
pub const MIN_BACKOFF_DELAY: Duration = Duration::from_millis(1);

/// Produces successive delays for a polling or retry loop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Backoff {
    current: Duration,
    growth: u32,
    max: Duration,
    jitter_percent: u32,
}

impl Backoff {
    /// Exponential schedule starting at `initial`, multiplied by `growth`
    /// after each step and capped at `max`. Both bounds are floored at
    /// [`MIN_BACKOFF_DELAY`].
    #[must_use]
    pub fn exponential(initial: Duration, growth: u32, max: Duration) -> Self {
        let cap = max.max(MIN_BACKOFF_DELAY);
        Self {
            current: initial.max(MIN_BACKOFF_DELAY).min(cap),
            growth: growth.max(1),
            max: cap,
            jitter_percent: 0,
        }
    }

    /// Constant schedule, floored at [`MIN_BACKOFF_DELAY`].
    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        let floored = interval.max(MIN_BACKOFF_DELAY);
        Self {
            current: floored,
            growth: 1,
            max: floored,
            jitter_percent: 0,
        }
    }

    /// Adds up to `percent` of each delay as random jitter. The jittered
    /// delay never exceeds the cap.
    #[must_use]
    pub const fn with_jitter_percent(mut self, percent: u32) -> Self {
        self.jitter_percent = percent;
        self
    }

    /// Returns the next delay and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = base
            .checked_mul(self.growth)
            .map_or(self.max, |grown| grown.min(self.max));
        self.jittered(base)
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.jitter_percent == 0 || base.is_zero() {
            return base;
        }
        let span = base
            .saturating_mul(self.jitter_percent)
            .checked_div(100)
            .unwrap_or_default();
        if span.is_zero() {
            return base;
        }
        let extra = rand::thread_rng().gen_range(Duration::ZERO..=span);
        base.saturating_add(extra).min(self.max.max(base))
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_delay())
    }
}
