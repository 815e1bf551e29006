//! Shared fixtures for waiter BDD scenarios.

use std::time::Duration;

use converge::ErrorKind;
use converge::test_support::ScriptedProbe;
use rstest::fixture;

/// Marker used in feature files for a not-found probe.
pub const NOT_FOUND_MARKER: &str = "-";

#[derive(Clone, Debug)]
pub struct WaiterContext {
    pub target: Vec<String>,
    pub not_found_checks: u32,
    pub continuous_target_occurrence: u32,
    pub timeout: Duration,
    pub probe: ScriptedProbe<String, String>,
    pub outcome: Option<WaitOutcome>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WaitOutcome {
    Settled(Option<String>),
    Failed(ErrorKind),
}

#[fixture]
pub fn waiter_context() -> WaiterContext {
    WaiterContext {
        target: Vec::new(),
        not_found_checks: 20,
        continuous_target_occurrence: 1,
        timeout: Duration::from_secs(60),
        probe: ScriptedProbe::new(),
        outcome: None,
    }
}

/// Splits a `|`-separated script into probe labels; `-` reads as not found.
pub fn script_labels(script: &str) -> impl Iterator<Item = &str> {
    script.split('|').map(|label| {
        if label == NOT_FOUND_MARKER {
            ""
        } else {
            label
        }
    })
}
