//! Configuration loading via `ortho-config`.
//!
//! Supplies the process-wide defaults for waits and retries. Individual
//! resource families still override what they need per call.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::error::{Classify, ErrorKind};
use crate::observation::StatusLabel;
use crate::retry::RetryPolicy;
use crate::wait::{WaitSpec, WaitSpecBuilder};

/// Default cadence and budgets, merged from defaults, `converge.toml`,
/// `CONVERGE_*` environment variables, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "CONVERGE",
    discovery(
        app_name = "converge",
        env_var = "CONVERGE_CONFIG_PATH",
        config_file_name = "converge.toml",
        dotfile_name = ".converge.toml",
        project_file_name = "converge.toml"
    )
)]
pub struct ReconcileConfig {
    /// Deadline for a single wait, in seconds.
    #[ortho_config(default = 1200)]
    pub wait_timeout_secs: u64,
    /// First poll interval, in milliseconds.
    #[ortho_config(default = 100)]
    pub min_poll_interval_ms: u64,
    /// Cap on the poll interval, in milliseconds.
    #[ortho_config(default = 10_000)]
    pub max_poll_interval_ms: u64,
    /// Consecutive not-found probes tolerated.
    #[ortho_config(default = 20)]
    pub not_found_checks: u32,
    /// Consecutive target observations required.
    #[ortho_config(default = 1)]
    pub continuous_target_occurrence: u32,
    /// Random jitter added to each interval, as a percentage.
    #[ortho_config(default = 10)]
    pub jitter_percent: u32,
    /// Budget for a retry loop, in seconds.
    #[ortho_config(default = 120)]
    pub retry_timeout_secs: u64,
    /// First retry delay, in milliseconds.
    #[ortho_config(default = 500)]
    pub retry_min_delay_ms: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn invalid(&self, problem: &str) -> ConfigError {
        ConfigError::Invalid(format!(
            "{} {problem}: set {} or {} in converge.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const WAIT_TIMEOUT: FieldMetadata =
    FieldMetadata::new("wait timeout", "CONVERGE_WAIT_TIMEOUT_SECS", "wait_timeout_secs");
const MIN_POLL_INTERVAL: FieldMetadata = FieldMetadata::new(
    "minimum poll interval",
    "CONVERGE_MIN_POLL_INTERVAL_MS",
    "min_poll_interval_ms",
);
const CONTINUOUS_TARGET_OCCURRENCE: FieldMetadata = FieldMetadata::new(
    "continuous target occurrence",
    "CONVERGE_CONTINUOUS_TARGET_OCCURRENCE",
    "continuous_target_occurrence",
);
const JITTER_PERCENT: FieldMetadata =
    FieldMetadata::new("jitter percentage", "CONVERGE_JITTER_PERCENT", "jitter_percent");
const RETRY_TIMEOUT: FieldMetadata =
    FieldMetadata::new("retry timeout", "CONVERGE_RETRY_TIMEOUT_SECS", "retry_timeout_secs");
const RETRY_MIN_DELAY: FieldMetadata = FieldMetadata::new(
    "minimum retry delay",
    "CONVERGE_RETRY_MIN_DELAY_MS",
    "retry_min_delay_ms",
);

impl ReconcileConfig {
    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("converge")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks that every value can drive a wait or retry loop.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the environment variable and
    /// TOML key to fix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait_timeout_secs == 0 {
            return Err(WAIT_TIMEOUT.invalid("must be greater than zero"));
        }
        if self.min_poll_interval_ms == 0 {
            return Err(MIN_POLL_INTERVAL.invalid("must be greater than zero"));
        }
        if self.min_poll_interval_ms > self.max_poll_interval_ms {
            return Err(MIN_POLL_INTERVAL.invalid(&format!(
                "must not exceed the maximum poll interval ({} ms)",
                self.max_poll_interval_ms
            )));
        }
        if self.continuous_target_occurrence == 0 {
            return Err(CONTINUOUS_TARGET_OCCURRENCE.invalid("must be at least 1"));
        }
        if self.jitter_percent > 100 {
            return Err(JITTER_PERCENT.invalid("must be between 0 and 100"));
        }
        if self.retry_timeout_secs == 0 {
            return Err(RETRY_TIMEOUT.invalid("must be greater than zero"));
        }
        if self.retry_min_delay_ms == 0 {
            return Err(RETRY_MIN_DELAY.invalid("must be greater than zero"));
        }
        if self.retry_min_delay_ms > self.max_poll_interval_ms {
            return Err(RETRY_MIN_DELAY.invalid(&format!(
                "must not exceed the maximum poll interval ({} ms)",
                self.max_poll_interval_ms
            )));
        }
        Ok(())
    }

    /// Deadline for a single wait.
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// Starts a [`WaitSpec`] for `target` carrying the configured cadence.
    /// Callers add pending states and family overrides before building.
    #[must_use]
    pub fn wait_spec<S, I>(&self, target: I) -> WaitSpecBuilder<S>
    where
        S: StatusLabel,
        I: IntoIterator<Item = S>,
    {
        self.tune(WaitSpec::until(target, self.wait_timeout()))
    }

    /// Starts a [`WaitSpec`] that succeeds once the entity is gone.
    #[must_use]
    pub fn wait_until_gone<S: StatusLabel>(&self) -> WaitSpecBuilder<S> {
        self.tune(WaitSpec::until_gone(self.wait_timeout()))
    }

    /// Builds the retry policy described by this configuration. Retry delays
    /// share the poll interval cap, which [`Self::validate`] keeps at or
    /// above the retry floor.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.retry_timeout_secs))
            .with_min_delay(Duration::from_millis(self.retry_min_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_poll_interval_ms))
            .with_jitter_percent(self.jitter_percent)
    }

    fn tune<S: StatusLabel>(&self, builder: WaitSpecBuilder<S>) -> WaitSpecBuilder<S> {
        builder
            .min_poll_interval(Duration::from_millis(self.min_poll_interval_ms))
            .max_poll_interval(Duration::from_millis(self.max_poll_interval_ms))
            .not_found_checks(self.not_found_checks)
            .continuous_target_occurrence(self.continuous_target_occurrence)
            .jitter_percent(self.jitter_percent)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl Classify for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}
