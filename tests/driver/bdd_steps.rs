//! BDD step definitions for the resource reconciler.

use std::future::Future;

use converge::test_support::{
    ApiCall, FAKE_AVAILABLE, FakeApiError, FakeControlPlane, FakeResource, Lag,
};
use converge::{Classify, ReconcileError};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{DriverContext, DriverOutcome, reconciler, request};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("reconciler setup failed: {0}")]
    Setup(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

type DriverResult<T> = Result<T, ReconcileError<FakeResource, FakeApiError>>;

/// Runs `operation` on a paused-clock runtime so lifecycle waits finish
/// instantly.
fn run<T>(operation: impl Future<Output = DriverResult<T>>) -> Result<DriverResult<T>, StepError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|err| StepError::Setup(err.to_string()))?;
    Ok(runtime.block_on(operation))
}

fn existing_id(driver_context: &DriverContext) -> Result<String, StepError> {
    driver_context
        .id
        .clone()
        .ok_or_else(|| StepError::Setup(String::from("no resource has been created")))
}

#[given("a control plane with \"{invisible}\" invisible reads and \"{transition}\" transition reads")]
fn control_plane(driver_context: DriverContext, invisible: u32, transition: u32) -> DriverContext {
    DriverContext {
        plane: FakeControlPlane::new(Lag {
            invisible_reads: invisible,
            transition_reads: transition,
            deleting_reads: transition,
        }),
        ..driver_context
    }
}

#[given("an existing resource named \"{name}\"")]
fn existing_resource(
    driver_context: DriverContext,
    name: String,
) -> Result<DriverContext, StepError> {
    let id = driver_context
        .plane
        .seed(&request(&name))
        .map_err(|err| StepError::Setup(err.to_string()))?;
    Ok(DriverContext {
        id: Some(id),
        ..driver_context
    })
}

#[given("the resource was removed out of band")]
fn removed_out_of_band(driver_context: DriverContext) -> Result<DriverContext, StepError> {
    let id = existing_id(&driver_context)?;
    driver_context.plane.forget(&id);
    Ok(driver_context)
}

#[given("the next create call fails with \"{message}\"")]
fn create_fails(driver_context: DriverContext, message: String) -> DriverContext {
    driver_context.plane.fail_next(ApiCall::Create, message);
    driver_context
}

#[when("I create a resource named \"{name}\"")]
fn create_resource(driver_context: DriverContext, name: String) -> Result<DriverContext, StepError> {
    let driver = reconciler(&driver_context.plane).map_err(|err| StepError::Setup(err.to_string()))?;
    let (id, outcome) = match run(driver.create(&request(&name)))? {
        Ok(created) => (Some(created.id), DriverOutcome::Object(created.object)),
        Err(err) => (None, DriverOutcome::Failed(err.kind())),
    };
    Ok(DriverContext {
        id,
        outcome: Some(outcome),
        ..driver_context
    })
}

#[when("I rename the resource to \"{name}\"")]
fn rename_resource(driver_context: DriverContext, name: String) -> Result<DriverContext, StepError> {
    let id = existing_id(&driver_context)?;
    let driver = reconciler(&driver_context.plane).map_err(|err| StepError::Setup(err.to_string()))?;
    let outcome = match run(driver.update(&id, &request(&name)))? {
        Ok(Some(object)) => DriverOutcome::Object(object),
        Ok(None) => DriverOutcome::Done,
        Err(err) => DriverOutcome::Failed(err.kind()),
    };
    Ok(DriverContext {
        outcome: Some(outcome),
        ..driver_context
    })
}

#[when("I delete the resource")]
fn delete_resource(driver_context: DriverContext) -> Result<DriverContext, StepError> {
    let id = existing_id(&driver_context)?;
    let driver = reconciler(&driver_context.plane).map_err(|err| StepError::Setup(err.to_string()))?;
    let outcome = match run(driver.delete(&id))? {
        Ok(()) => DriverOutcome::Done,
        Err(err) => DriverOutcome::Failed(err.kind()),
    };
    Ok(DriverContext {
        outcome: Some(outcome),
        ..driver_context
    })
}

#[then("the resource is available")]
fn resource_available(driver_context: &DriverContext) -> Result<(), StepError> {
    match &driver_context.outcome {
        Some(DriverOutcome::Object(object)) if object.status == FAKE_AVAILABLE => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected an available resource, got {other:?}"
        ))),
    }
}

#[then("the resource is named \"{name}\"")]
fn resource_named(driver_context: &DriverContext, name: String) -> Result<(), StepError> {
    match &driver_context.outcome {
        Some(DriverOutcome::Object(object)) if object.name == name => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a resource named {name}, got {other:?}"
        ))),
    }
}

#[then("the reconcile succeeds")]
fn reconcile_succeeds(driver_context: &DriverContext) -> Result<(), StepError> {
    match &driver_context.outcome {
        Some(DriverOutcome::Done) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected the reconcile to succeed, got {other:?}"
        ))),
    }
}

#[then("the reconcile fails with \"{kind}\"")]
fn reconcile_fails(driver_context: &DriverContext, kind: String) -> Result<(), StepError> {
    match &driver_context.outcome {
        Some(DriverOutcome::Failed(actual)) if actual.as_str() == kind => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a {kind} failure, got {other:?}"
        ))),
    }
}

#[then("the resource no longer exists")]
fn resource_gone(driver_context: &DriverContext) -> Result<(), StepError> {
    let id = existing_id(driver_context)?;
    if driver_context.plane.contains(&id) {
        return Err(StepError::Assertion(format!("{id} still exists")));
    }
    Ok(())
}

fn assert_calls(
    driver_context: &DriverContext,
    call: ApiCall,
    count: usize,
) -> Result<(), StepError> {
    let seen = driver_context.plane.count(call);
    if seen == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} {call:?} calls, observed {seen}"
        )))
    }
}

#[then("the control plane saw \"{count}\" create calls")]
fn control_plane_saw_creates(driver_context: &DriverContext, count: usize) -> Result<(), StepError> {
    assert_calls(driver_context, ApiCall::Create, count)
}

#[then("the control plane saw \"{count}\" describe calls")]
fn control_plane_saw_describes(
    driver_context: &DriverContext,
    count: usize,
) -> Result<(), StepError> {
    assert_calls(driver_context, ApiCall::Describe, count)
}
