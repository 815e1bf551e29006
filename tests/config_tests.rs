//! Unit tests for configuration loading and validation.

use std::time::Duration;

use converge::test_support::EnvGuard;
use converge::{Classify, ConfigError, ErrorKind, ReconcileConfig};
use rstest::*;

#[fixture]
fn defaults() -> ReconcileConfig {
    ReconcileConfig {
        wait_timeout_secs: 1200,
        min_poll_interval_ms: 100,
        max_poll_interval_ms: 10_000,
        not_found_checks: 20,
        continuous_target_occurrence: 1,
        jitter_percent: 10,
        retry_timeout_secs: 120,
        retry_min_delay_ms: 500,
    }
}

#[rstest]
#[tokio::test]
async fn loads_defaults_without_overrides(defaults: ReconcileConfig) {
    let _guard = EnvGuard::set_vars(&[]).await;

    let config = ReconcileConfig::load_without_cli_args().expect("defaults load");

    assert_eq!(config, defaults);
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn environment_overrides_defaults() {
    let _guard = EnvGuard::set_vars(&[
        ("CONVERGE_NOT_FOUND_CHECKS", "1000"),
        ("CONVERGE_CONTINUOUS_TARGET_OCCURRENCE", "2"),
    ])
    .await;

    let config = ReconcileConfig::load_without_cli_args().expect("environment loads");

    assert_eq!(config.not_found_checks, 1000);
    assert_eq!(config.continuous_target_occurrence, 2);
    assert_eq!(config.wait_timeout_secs, 1200);
}

/// Every rejected value names the environment variable and TOML key to fix.
#[rstest]
#[case::zero_wait_timeout(
    |cfg: &mut ReconcileConfig| cfg.wait_timeout_secs = 0,
    "CONVERGE_WAIT_TIMEOUT_SECS",
    "wait_timeout_secs"
)]
#[case::zero_min_poll(
    |cfg: &mut ReconcileConfig| cfg.min_poll_interval_ms = 0,
    "CONVERGE_MIN_POLL_INTERVAL_MS",
    "min_poll_interval_ms"
)]
#[case::min_poll_above_max(
    |cfg: &mut ReconcileConfig| cfg.min_poll_interval_ms = 20_000,
    "CONVERGE_MIN_POLL_INTERVAL_MS",
    "min_poll_interval_ms"
)]
#[case::zero_continuous_occurrence(
    |cfg: &mut ReconcileConfig| cfg.continuous_target_occurrence = 0,
    "CONVERGE_CONTINUOUS_TARGET_OCCURRENCE",
    "continuous_target_occurrence"
)]
#[case::jitter_above_hundred(
    |cfg: &mut ReconcileConfig| cfg.jitter_percent = 101,
    "CONVERGE_JITTER_PERCENT",
    "jitter_percent"
)]
#[case::zero_retry_timeout(
    |cfg: &mut ReconcileConfig| cfg.retry_timeout_secs = 0,
    "CONVERGE_RETRY_TIMEOUT_SECS",
    "retry_timeout_secs"
)]
#[case::zero_retry_delay(
    |cfg: &mut ReconcileConfig| cfg.retry_min_delay_ms = 0,
    "CONVERGE_RETRY_MIN_DELAY_MS",
    "retry_min_delay_ms"
)]
#[case::retry_delay_above_poll_cap(
    |cfg: &mut ReconcileConfig| cfg.max_poll_interval_ms = 200,
    "CONVERGE_RETRY_MIN_DELAY_MS",
    "retry_min_delay_ms"
)]
fn validation_errors_are_actionable(
    defaults: ReconcileConfig,
    #[case] mutate: fn(&mut ReconcileConfig),
    #[case] env_var: &str,
    #[case] toml_key: &str,
) {
    let mut cfg = defaults;
    mutate(&mut cfg);

    let error = cfg.validate().expect_err("validation should fail");

    assert!(matches!(error, ConfigError::Invalid(_)));
    assert_eq!(error.kind(), ErrorKind::Config);
    let message = error.to_string();
    assert!(
        message.contains(env_var),
        "error should mention env var {env_var}: {message}"
    );
    assert!(
        message.contains("converge.toml"),
        "error should mention config file: {message}"
    );
    assert!(
        message.contains(toml_key),
        "error should mention TOML key {toml_key}: {message}"
    );
}

#[rstest]
fn wait_specs_carry_the_configured_cadence(defaults: ReconcileConfig) {
    let cfg = ReconcileConfig {
        not_found_checks: 5,
        continuous_target_occurrence: 3,
        ..defaults
    };

    let spec = cfg
        .wait_spec([String::from("available")])
        .pending([String::from("pending")])
        .build()
        .expect("spec");

    assert_eq!(spec.timeout(), Duration::from_secs(1200));
    assert_eq!(spec.not_found_checks(), 5);
    assert_eq!(spec.continuous_target_occurrence(), 3);
    assert!(!spec.waits_for_absence());

    let gone = cfg.wait_until_gone::<String>().build().expect("spec");
    assert!(gone.waits_for_absence());
}

#[rstest]
fn retry_policy_uses_the_retry_budget(defaults: ReconcileConfig) {
    let policy = defaults.retry_policy();
    assert_eq!(policy.timeout(), Duration::from_secs(120));
}
