//! Reconciliation settings
//!
//! Defaults reproduce the deploy hook's historical behaviour: twelve
//! attempts, five seconds apart, checking for `application/json` and the
//! `ENABLE_COMPRESSION` flag. Settings can come from a TOML file and are then
//! overridden by `BINARY_STATUS_*` environment variables.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 12;
pub const DEFAULT_BACKOFF_MS: u64 = 5000;
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";
pub const DEFAULT_FLAG_KEY: &str = "ENABLE_COMPRESSION";

/// Delay between polling attempts
///
/// With `multiplier = 1.0` (the default) the delay is fixed; larger
/// multipliers grow it geometrically up to `max_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub multiplier: f64,
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: DEFAULT_BACKOFF_MS,
            multiplier: 1.0,
            max_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

impl BackoffConfig {
    /// Fixed delay between attempts
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            initial_ms: ms,
            multiplier: 1.0,
            max_ms: ms,
        }
    }

    /// Delay to wait after the given number of failed attempts (1-based)
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1) as i32;
        let ms = self.initial_ms as f64 * self.multiplier.powi(exponent);
        let ms = if ms.is_finite() { ms as u64 } else { self.max_ms };
        Duration::from_millis(ms.min(self.max_ms.max(self.initial_ms)))
    }
}

/// Configuration of one reconciliation run
///
/// Unknown keys are rejected so a misspelt setting cannot silently fall back
/// to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Failed aggregate checks allowed before the flag is reverted
    pub max_attempts: u32,
    pub backoff: BackoffConfig,
    /// Binary media type the gateway must advertise
    pub expected_media_type: String,
    /// Environment variable toggled on each function
    pub flag_key: String,
    /// Version or alias used when reading function configuration
    pub qualifier: Option<String>,
    /// Report a non-converged run as a failure to the deploy
    pub fail_on_unconverged: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffConfig::default(),
            expected_media_type: DEFAULT_MEDIA_TYPE.to_string(),
            flag_key: DEFAULT_FLAG_KEY.to_string(),
            qualifier: None,
            fail_on_unconverged: false,
        }
    }
}

impl ReconcileConfig {
    /// Create a new config builder
    pub fn builder() -> ReconcileConfigBuilder {
        ReconcileConfigBuilder::new()
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `BINARY_STATUS_*` environment variable overrides
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_parse::<u32>("BINARY_STATUS_MAX_ATTEMPTS")? {
            self.max_attempts = v;
        }
        if let Some(v) = env_parse::<u64>("BINARY_STATUS_BACKOFF_MS")? {
            self.backoff.initial_ms = v;
            self.backoff.max_ms = self.backoff.max_ms.max(v);
        }
        if let Some(v) = env_parse::<f64>("BINARY_STATUS_BACKOFF_MULTIPLIER")? {
            self.backoff.multiplier = v;
        }
        if let Some(v) = env_parse::<u64>("BINARY_STATUS_BACKOFF_MAX_MS")? {
            self.backoff.max_ms = v;
        }
        if let Ok(v) = std::env::var("BINARY_STATUS_MEDIA_TYPE") {
            self.expected_media_type = v;
        }
        if let Ok(v) = std::env::var("BINARY_STATUS_FLAG_KEY") {
            self.flag_key = v;
        }
        if let Ok(v) = std::env::var("BINARY_STATUS_QUALIFIER") {
            self.qualifier = Some(v);
        }
        if let Some(v) = env_parse::<bool>("BINARY_STATUS_FAIL_ON_UNCONVERGED")? {
            self.fail_on_unconverged = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::configuration("max_attempts must be at least 1"));
        }
        if !(self.backoff.multiplier >= 1.0) {
            return Err(Error::configuration("backoff.multiplier must be >= 1.0"));
        }
        if self.flag_key.is_empty() {
            return Err(Error::configuration("flag_key must not be empty"));
        }
        if self.expected_media_type.is_empty() {
            return Err(Error::configuration("expected_media_type must not be empty"));
        }
        Ok(())
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::configuration(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Builder for ReconcileConfig
pub struct ReconcileConfigBuilder {
    config: ReconcileConfig,
}

impl ReconcileConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ReconcileConfig::default(),
        }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub fn expected_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.config.expected_media_type = media_type.into();
        self
    }

    pub fn flag_key(mut self, key: impl Into<String>) -> Self {
        self.config.flag_key = key.into();
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.config.qualifier = Some(qualifier.into());
        self
    }

    pub fn fail_on_unconverged(mut self, fail: bool) -> Self {
        self.config.fail_on_unconverged = fail;
        self
    }

    pub fn build(self) -> Result<ReconcileConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ReconcileConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
