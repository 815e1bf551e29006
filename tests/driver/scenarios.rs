//! BDD scenarios for the resource reconciler.

use rstest_bdd_macros::scenario;

use super::test_helpers::{DriverContext, driver_context};

#[scenario(
    path = "tests/features/driver.feature",
    name = "Create a resource that is slow to appear"
)]
fn scenario_slow_create(driver_context: DriverContext) {
    drop(driver_context);
}

#[scenario(
    path = "tests/features/driver.feature",
    name = "Update a resource in place"
)]
fn scenario_update(driver_context: DriverContext) {
    drop(driver_context);
}

#[scenario(
    path = "tests/features/driver.feature",
    name = "Delete waits until the resource is gone"
)]
fn scenario_delete(driver_context: DriverContext) {
    drop(driver_context);
}

#[scenario(
    path = "tests/features/driver.feature",
    name = "Deleting a missing resource is a no-op"
)]
fn scenario_idempotent_delete(driver_context: DriverContext) {
    drop(driver_context);
}

#[scenario(
    path = "tests/features/driver.feature",
    name = "Surface API failures without retrying"
)]
fn scenario_create_failure(driver_context: DriverContext) {
    drop(driver_context);
}
