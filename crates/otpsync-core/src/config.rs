//! Resynchronization policy configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults, or deserialized from the host's own configuration file.
//!
//! ## NIST 800-53 Rev5: IA-5 (Authenticator Management)
//!
//! The search window bounds how many validation attempts a single
//! resynchronization request may trigger. It is a policy constant and is
//! never derived from request input.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of counter offsets searched per token.
pub const DEFAULT_MAX_STEPS: u32 = 25;

/// Hard ceiling on the search window, whatever the configuration says.
pub const MAX_STEPS_CEILING: u32 = 100;

/// Default upper bound on the size of an encoded control value.
pub const DEFAULT_MAX_CONTROL_VALUE_LEN: usize = 1024;

/// Resynchronization policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Number of counter offsets searched per candidate token.
    pub max_steps: u32,

    /// Largest encoded control value accepted before parsing.
    pub max_control_value_len: usize,

    /// Fail operations that carry more than one synchronization control.
    pub reject_multiple_controls: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_control_value_len: DEFAULT_MAX_CONTROL_VALUE_LEN,
            reject_multiple_controls: false,
        }
    }
}

impl SyncConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search window.
    #[must_use]
    pub const fn max_steps(mut self, steps: u32) -> Self {
        self.max_steps = steps;
        self
    }

    /// Sets the maximum encoded control length.
    #[must_use]
    pub const fn max_control_value_len(mut self, len: usize) -> Self {
        self.max_control_value_len = len;
        self
    }

    /// Sets whether multiple synchronization controls are rejected.
    #[must_use]
    pub const fn reject_multiple_controls(mut self, reject: bool) -> Self {
        self.reject_multiple_controls = reject;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `OTPSYNC_MAX_STEPS` | `max_steps` |
    /// | `OTPSYNC_MAX_CONTROL_LEN` | `max_control_value_len` |
    /// | `OTPSYNC_REJECT_MULTIPLE` | `reject_multiple_controls` |
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a variable is set but cannot be parsed, or
    /// if the resulting configuration fails [`SyncConfig::validate`].
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let max_steps = env_parse("OTPSYNC_MAX_STEPS")?.unwrap_or(defaults.max_steps);

        let max_control_value_len =
            env_parse("OTPSYNC_MAX_CONTROL_LEN")?.unwrap_or(defaults.max_control_value_len);

        let reject_multiple_controls = std::env::var("OTPSYNC_REJECT_MULTIPLE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(defaults.reject_multiple_controls);

        let config = Self {
            max_steps,
            max_control_value_len,
            reject_multiple_controls,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the policy bounds.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `max_steps` is zero or above
    /// [`MAX_STEPS_CEILING`], or if `max_control_value_len` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(Error::config("max_steps must be at least 1"));
        }
        if self.max_steps > MAX_STEPS_CEILING {
            return Err(Error::config(format!(
                "max_steps {} exceeds the ceiling of {MAX_STEPS_CEILING}",
                self.max_steps
            )));
        }
        if self.max_control_value_len == 0 {
            return Err(Error::config("max_control_value_len must be positive"));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::config(format!("{key} is not a valid number: {raw:?}"))),
        Err(_) => Ok(None),
    }
}
