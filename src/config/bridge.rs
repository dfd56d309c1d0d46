//! Bridge configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, WaitPolicy};

const MIN_STACK_SIZE: usize = 64 * 1024;

/// Tunables for the scheduler and callback-awaited tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long a callback-awaited task waits for its completion, in milliseconds.
    pub callback_timeout_ms: u64,
    /// When false, callback-awaited tasks wait indefinitely.
    pub timeout_enabled: bool,
    /// Host pump cadence used by `run_until_idle`, in milliseconds.
    pub pump_interval_ms: u64,
    /// Maximum number of tasks in flight before submits are refused.
    pub max_in_flight: usize,
    /// Stack size of each background thread in bytes.
    pub thread_stack_size: usize,
    /// Background threads are named `<prefix>-<task id>`.
    pub thread_name_prefix: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            callback_timeout_ms: 60_000,
            timeout_enabled: true,
            pump_interval_ms: 100,
            max_in_flight: 256,
            thread_stack_size: 2 * 1024 * 1024,
            thread_name_prefix: "bridge-task".into(),
        }
    }
}

impl BridgeConfig {
    /// Defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callback timeout.
    #[must_use]
    pub const fn with_callback_timeout_ms(mut self, ms: u64) -> Self {
        self.callback_timeout_ms = ms;
        self
    }

    /// Enable or disable timeout tracking.
    #[must_use]
    pub const fn with_timeout_enabled(mut self, enabled: bool) -> Self {
        self.timeout_enabled = enabled;
        self
    }

    /// Set the host pump cadence.
    #[must_use]
    pub const fn with_pump_interval_ms(mut self, ms: u64) -> Self {
        self.pump_interval_ms = ms;
        self
    }

    /// Set the admission limit.
    #[must_use]
    pub const fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Set the background thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Set the background thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Wait policy derived from the timeout settings.
    #[must_use]
    pub const fn wait_policy(&self) -> WaitPolicy {
        if self.timeout_enabled {
            WaitPolicy::bounded(Duration::from_millis(self.callback_timeout_ms))
        } else {
            WaitPolicy::unbounded()
        }
    }

    /// Host pump cadence.
    #[must_use]
    pub const fn pump_interval(&self) -> Duration {
        Duration::from_millis(self.pump_interval_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.callback_timeout_ms == 0 {
            return Err("callback_timeout_ms must be greater than 0".into());
        }
        if self.pump_interval_ms == 0 {
            return Err("pump_interval_ms must be greater than 0".into());
        }
        if self.max_in_flight == 0 {
            return Err("max_in_flight must be greater than 0".into());
        }
        if self.thread_stack_size < MIN_STACK_SIZE {
            return Err(format!("thread_stack_size must be at least {MIN_STACK_SIZE} bytes"));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overridden by `BRIDGE_*` environment variables. A `.env` file in
    /// the working directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// An unparsable variable or a validation failure.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `BRIDGE_*` key.
    ///
    /// # Errors
    ///
    /// An unparsable value or a validation failure.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, String>
        where
            T::Err: std::fmt::Display,
        {
            raw.trim().parse().map_err(|e| format!("{key}: {e}"))
        }

        let mut cfg = Self::default();
        if let Some(raw) = lookup("BRIDGE_CALLBACK_TIMEOUT_MS") {
            cfg.callback_timeout_ms = parse("BRIDGE_CALLBACK_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("BRIDGE_TIMEOUT_ENABLED") {
            cfg.timeout_enabled = parse("BRIDGE_TIMEOUT_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("BRIDGE_PUMP_INTERVAL_MS") {
            cfg.pump_interval_ms = parse("BRIDGE_PUMP_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("BRIDGE_MAX_IN_FLIGHT") {
            cfg.max_in_flight = parse("BRIDGE_MAX_IN_FLIGHT", &raw)?;
        }
        if let Some(raw) = lookup("BRIDGE_THREAD_STACK_SIZE") {
            cfg.thread_stack_size = parse("BRIDGE_THREAD_STACK_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("BRIDGE_THREAD_NAME_PREFIX") {
            cfg.thread_name_prefix = raw;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// The file cannot be read, does not parse or fails validation.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading {}", path.display()))
    }
}
