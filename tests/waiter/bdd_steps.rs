//! BDD step definitions for the state-change waiter.

use std::time::Duration;

use converge::Classify;
use converge::observation::Observation;
use converge::test_support::{ProbeError, ProbeStep};
use converge::wait::{WaitSpec, wait_for_state};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{WaitOutcome, WaiterContext, script_labels};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("waiter setup failed: {0}")]
    Setup(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a waiter targeting \"{status}\"")]
fn waiter_targeting(waiter_context: WaiterContext, status: String) -> WaiterContext {
    WaiterContext {
        target: vec![status],
        ..waiter_context
    }
}

#[given("a waiter targeting absence")]
fn waiter_targeting_absence(waiter_context: WaiterContext) -> WaiterContext {
    WaiterContext {
        target: Vec::new(),
        ..waiter_context
    }
}

#[given("the waiter tolerates \"{checks}\" not-found checks")]
fn waiter_tolerates(waiter_context: WaiterContext, checks: u32) -> WaiterContext {
    WaiterContext {
        not_found_checks: checks,
        ..waiter_context
    }
}

#[given("the waiter requires \"{count}\" consecutive target observations")]
fn waiter_requires(waiter_context: WaiterContext, count: u32) -> WaiterContext {
    WaiterContext {
        continuous_target_occurrence: count,
        ..waiter_context
    }
}

#[given("the resource reports \"{script}\"")]
fn resource_reports(waiter_context: WaiterContext, script: String) -> WaiterContext {
    for label in script_labels(&script) {
        waiter_context
            .probe
            .push(ProbeStep::Observe(Observation::from_label(
                label.to_owned(),
                label.to_owned(),
            )));
    }
    waiter_context
}

#[given("the next probe fails with \"{message}\"")]
fn next_probe_fails(waiter_context: WaiterContext, message: String) -> WaiterContext {
    waiter_context.probe.push_failure(ProbeError::remote(message));
    waiter_context
}

#[when("I wait for the resource")]
fn wait_for_resource(waiter_context: WaiterContext) -> Result<WaiterContext, StepError> {
    let spec = WaitSpec::until(waiter_context.target.clone(), waiter_context.timeout)
        .poll_interval(Duration::from_secs(1))
        .jitter_percent(0)
        .not_found_checks(waiter_context.not_found_checks)
        .continuous_target_occurrence(waiter_context.continuous_target_occurrence)
        .build()
        .map_err(|err| StepError::Setup(err.to_string()))?;

    // Paused time lets minute-long waits finish instantly.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|err| StepError::Setup(err.to_string()))?;
    let outcome = match runtime.block_on(wait_for_state(&spec, waiter_context.probe.probe())) {
        Ok(object) => WaitOutcome::Settled(object),
        Err(err) => WaitOutcome::Failed(err.kind()),
    };

    Ok(WaiterContext {
        outcome: Some(outcome),
        ..waiter_context
    })
}

#[then("the wait settles on \"{status}\"")]
fn wait_settles_on(waiter_context: &WaiterContext, status: String) -> Result<(), StepError> {
    match &waiter_context.outcome {
        Some(WaitOutcome::Settled(Some(object))) if *object == status => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected the wait to settle on {status}, got {other:?}"
        ))),
    }
}

#[then("the resource is gone")]
fn resource_is_gone(waiter_context: &WaiterContext) -> Result<(), StepError> {
    match &waiter_context.outcome {
        Some(WaitOutcome::Settled(None)) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected the wait to observe absence, got {other:?}"
        ))),
    }
}

#[then("the wait fails with \"{kind}\"")]
fn wait_fails_with(waiter_context: &WaiterContext, kind: String) -> Result<(), StepError> {
    match &waiter_context.outcome {
        Some(WaitOutcome::Failed(actual)) if actual.as_str() == kind => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a {kind} failure, got {other:?}"
        ))),
    }
}

#[then("the resource was probed \"{count}\" times")]
fn resource_probed(waiter_context: &WaiterContext, count: u32) -> Result<(), StepError> {
    let calls = waiter_context.probe.calls();
    if calls == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} probes, observed {calls}"
        )))
    }
}
