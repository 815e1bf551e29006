//! Shared fixtures for reconciler BDD scenarios.

use std::time::Duration;

use converge::test_support::{
    FAKE_AVAILABLE, FAKE_DELETING, FAKE_MODIFYING, FAKE_PENDING, FakeControlPlane, FakeRequest,
    FakeResource,
};
use converge::wait::{SpecError, WaitSpec};
use converge::{ErrorKind, Reconciler};
use rstest::fixture;

pub const PARENT: &str = "vpc-0a1b";

#[derive(Clone, Debug, Default)]
pub struct DriverContext {
    pub plane: FakeControlPlane,
    pub id: Option<String>,
    pub outcome: Option<DriverOutcome>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DriverOutcome {
    Object(FakeResource),
    Done,
    Failed(ErrorKind),
}

#[fixture]
pub fn driver_context() -> DriverContext {
    DriverContext::default()
}

pub fn request(name: &str) -> FakeRequest {
    FakeRequest {
        parent: String::from(PARENT),
        name: name.to_owned(),
    }
}

/// Builds a reconciler polling once a second, with a lifecycle wait for
/// every operation.
pub fn reconciler(plane: &FakeControlPlane) -> Result<Reconciler<FakeControlPlane>, SpecError> {
    let timeout = Duration::from_secs(300);
    let interval = Duration::from_secs(1);
    let create = WaitSpec::until([FAKE_AVAILABLE], timeout)
        .pending([FAKE_PENDING])
        .poll_interval(interval)
        .build()?;
    let update = WaitSpec::until([FAKE_AVAILABLE], timeout)
        .pending([FAKE_MODIFYING])
        .poll_interval(interval)
        .build()?;
    let delete = WaitSpec::until_gone(timeout)
        .pending([FAKE_DELETING])
        .poll_interval(interval)
        .build()?;
    Ok(Reconciler::new(plane.clone(), create)
        .with_update_spec(update)
        .with_delete_spec(delete))
}
