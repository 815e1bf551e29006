//! BDD scenarios for the state-change waiter.

use rstest_bdd_macros::scenario;

use super::test_helpers::{WaiterContext, waiter_context};

#[scenario(
    path = "tests/features/waiter.feature",
    name = "Converge through read-after-write lag"
)]
fn scenario_read_after_write_lag(waiter_context: WaiterContext) {
    drop(waiter_context);
}

#[scenario(
    path = "tests/features/waiter.feature",
    name = "Flapping status never converges"
)]
fn scenario_flapping(waiter_context: WaiterContext) {
    drop(waiter_context);
}

#[scenario(
    path = "tests/features/waiter.feature",
    name = "Give up on a resource that never appears"
)]
fn scenario_never_appears(waiter_context: WaiterContext) {
    drop(waiter_context);
}

#[scenario(
    path = "tests/features/waiter.feature",
    name = "Wait for a deleted resource to disappear"
)]
fn scenario_disappears(waiter_context: WaiterContext) {
    drop(waiter_context);
}

#[scenario(
    path = "tests/features/waiter.feature",
    name = "Probe failures end the wait"
)]
fn scenario_probe_failure(waiter_context: WaiterContext) {
    drop(waiter_context);
}
