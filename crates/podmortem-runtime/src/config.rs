//! Dispatch configuration.
//!
//! Every tunable has a default, so an empty document is a valid
//! configuration. Durations are written human-readably (`30s`, `1500ms`).
//!
//! ```yaml
//! timeout: 30s
//! retry:
//!   max_attempts: 3
//!   delay: 1s
//! circuit_breaker:
//!   request_volume_threshold: 10
//!   failure_ratio: 0.5
//!   success_threshold: 3
//!   delay: 5s
//! fallback:
//!   confidence: 0.6
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use podmortem_core::DEFAULT_FALLBACK_CONFIDENCE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::{CircuitBreakerConfig, RetryConfig};

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Full dispatch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Hard wall-clock bound per provider attempt
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,

    pub retry: RetryConfig,

    pub circuit_breaker: CircuitBreakerConfig,

    pub fallback: FallbackConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

/// Settings for degraded responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    /// Confidence attached to fallback responses
    pub confidence: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_FALLBACK_CONFIDENCE,
        }
    }
}

impl DispatchConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject values the resilience policies cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be greater than zero".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        let cb = &self.circuit_breaker;
        if cb.request_volume_threshold == 0 {
            return Err(ConfigError::Invalid(
                "circuit_breaker.request_volume_threshold must be at least 1".into(),
            ));
        }
        if !(cb.failure_ratio > 0.0 && cb.failure_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "circuit_breaker.failure_ratio must be in (0, 1], got {}",
                cb.failure_ratio
            )));
        }
        if cb.success_threshold == 0 {
            return Err(ConfigError::Invalid(
                "circuit_breaker.success_threshold must be at least 1".into(),
            ));
        }

        let confidence = self.fallback.confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ConfigError::Invalid(format!(
                "fallback.confidence must be in [0, 1], got {}",
                confidence
            )));
        }

        Ok(())
    }
}

/// Serde adapter for `humantime` durations ("30s", "1500ms", "1m 30s").
pub(crate) mod humantime_duration {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(de::Error::custom)
    }
}
