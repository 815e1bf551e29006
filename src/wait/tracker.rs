//! Pure transition logic for the waiter, kept free of timers so every
//! hysteresis rule can be exercised without sleeping.

use crate::observation::{Observation, StatusLabel};

use super::WaitSpec;

/// Outcome of feeding one observation to the [`Tracker`].
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Transition<T> {
    /// Keep polling; carries the object seen, if any.
    Polling(Option<T>),
    /// The target condition held for the required number of probes.
    Succeeded(Option<T>),
    /// The entity stayed absent for longer than tolerated.
    NotFound { checks: u32 },
    /// Strict mode saw a status outside the declared sets.
    Unexpected(T),
}

#[derive(Debug)]
pub(crate) struct Tracker<'spec, S> {
    spec: &'spec WaitSpec<S>,
    target_hits: u32,
    not_found: u32,
    last_status: Option<S>,
    polls: u32,
}

impl<'spec, S: StatusLabel> Tracker<'spec, S> {
    pub(crate) const fn new(spec: &'spec WaitSpec<S>) -> Self {
        Self {
            spec,
            target_hits: 0,
            not_found: 0,
            last_status: None,
            polls: 0,
        }
    }

    pub(crate) const fn polls(&self) -> u32 {
        self.polls
    }

    pub(crate) const fn last_status(&self) -> Option<&S> {
        self.last_status.as_ref()
    }

    pub(crate) fn observe<T>(&mut self, observation: Observation<T, S>) -> Transition<T> {
        self.polls = self.polls.saturating_add(1);
        match observation {
            Observation::NotFound => self.observe_absent(),
            Observation::Found { object, status } => self.observe_status(object, status),
        }
    }

    fn observe_absent<T>(&mut self) -> Transition<T> {
        self.last_status = None;
        if self.spec.waits_for_absence() {
            return self.hit(None);
        }

        self.target_hits = 0;
        self.not_found = self.not_found.saturating_add(1);
        if self.not_found > self.spec.not_found_checks {
            return Transition::NotFound {
                checks: self.not_found,
            };
        }
        Transition::Polling(None)
    }

    fn observe_status<T>(&mut self, object: T, status: S) -> Transition<T> {
        self.not_found = 0;
        let in_target = self.spec.is_target(&status);
        let expected = self.spec.is_expected(&status);
        self.last_status = Some(status);

        if in_target {
            return self.hit(Some(object));
        }

        self.target_hits = 0;
        if !expected {
            return Transition::Unexpected(object);
        }
        Transition::Polling(Some(object))
    }

    fn hit<T>(&mut self, object: Option<T>) -> Transition<T> {
        self.target_hits = self.target_hits.saturating_add(1);
        if self.target_hits >= self.spec.continuous_target_occurrence {
            return Transition::Succeeded(object);
        }
        Transition::Polling(object)
    }
}
