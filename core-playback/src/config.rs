//! # Playback Configuration
//!
//! Retry limits and quality policy, loadable from JSON.
//!
//! Every field is optional in the document:
//!
//! ```json
//! {
//!   "retry": { "maximum_retry_count": 5, "retry_timeout": 2.5 },
//!   "quality": { "initial_quality": "high", "degrade_on_retry": true }
//! }
//! ```
//!
//! `retry_timeout` is given in (fractional) seconds.

use crate::error::{PlaybackError, Result};
use crate::quality::AudioQuality;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attempts before a retry producer gives up.
pub const DEFAULT_MAXIMUM_RETRY_COUNT: u32 = 10;

/// Delay between two retry events.
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest accepted delay between retries.
const MAX_RETRY_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Retry producer limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of timer firings before `RetryFailed` is emitted.
    ///
    /// Default: 10.
    #[serde(default = "default_maximum_retry_count")]
    pub maximum_retry_count: u32,

    /// Delay between retry events.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_retry_timeout", with = "duration_secs")]
    pub retry_timeout: Duration,
}

fn default_maximum_retry_count() -> u32 {
    DEFAULT_MAXIMUM_RETRY_COUNT
}

fn default_retry_timeout() -> Duration {
    DEFAULT_RETRY_TIMEOUT
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            maximum_retry_count: default_maximum_retry_count(),
            retry_timeout: default_retry_timeout(),
        }
    }
}

impl RetryConfig {
    /// Short interval for interactive sessions where the listener is watching.
    pub fn aggressive() -> Self {
        Self {
            maximum_retry_count: 20,
            retry_timeout: Duration::from_secs(2),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.maximum_retry_count == 0 {
            return Err(PlaybackError::InvalidConfig(
                "maximum_retry_count must be at least 1".to_string(),
            ));
        }

        if self.retry_timeout.is_zero() {
            return Err(PlaybackError::InvalidConfig(
                "retry_timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry_timeout > MAX_RETRY_TIMEOUT {
            return Err(PlaybackError::InvalidConfig(format!(
                "retry_timeout exceeds maximum of {}s",
                MAX_RETRY_TIMEOUT.as_secs()
            )));
        }

        Ok(())
    }
}

/// Stream quality policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Variant loaded when a session starts without an explicit quality.
    ///
    /// Default: `high`.
    #[serde(default = "default_initial_quality")]
    pub initial_quality: AudioQuality,

    /// Step down one quality level on each retry instead of reloading the
    /// same variant.
    ///
    /// Default: `true`.
    #[serde(default = "default_degrade_on_retry")]
    pub degrade_on_retry: bool,
}

fn default_initial_quality() -> AudioQuality {
    AudioQuality::High
}

fn default_degrade_on_retry() -> bool {
    true
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            initial_quality: default_initial_quality(),
            degrade_on_retry: default_degrade_on_retry(),
        }
    }
}

/// Complete playback recovery configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub quality: QualityConfig,
}

impl PlaybackConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.retry.validate()
    }
}

/// Serializes a `Duration` as fractional seconds.
mod duration_secs {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| D::Error::custom(format!("invalid duration in seconds: {}", secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlaybackConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.maximum_retry_count, 10);
        assert_eq!(config.retry.retry_timeout, Duration::from_secs(10));
        assert_eq!(config.quality.initial_quality, AudioQuality::High);
        assert!(config.quality.degrade_on_retry);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PlaybackConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PlaybackConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = PlaybackConfig::from_json_str(
            r#"{ "retry": { "retry_timeout": 2.5 }, "quality": { "initial_quality": "lossless" } }"#,
        )
        .unwrap();

        assert_eq!(config.retry.maximum_retry_count, 10);
        assert_eq!(config.retry.retry_timeout, Duration::from_millis(2_500));
        assert_eq!(config.quality.initial_quality, AudioQuality::Lossless);
        assert!(config.quality.degrade_on_retry);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            PlaybackConfig::from_json_str("{ not json"),
            Err(PlaybackError::ConfigParse(_))
        ));
        assert!(matches!(
            PlaybackConfig::from_json_str(r#"{ "retry": { "retry_timeout": -1 } }"#),
            Err(PlaybackError::ConfigParse(_))
        ));
        assert!(matches!(
            PlaybackConfig::from_json_str(r#"{ "quality": { "initial_quality": "ultra" } }"#),
            Err(PlaybackError::ConfigParse(_))
        ));
        assert!(matches!(
            PlaybackConfig::from_json_str(r#"{ "retry": { "maximum_retry_count": 0 } }"#),
            Err(PlaybackError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_retry_validation() {
        let mut retry = RetryConfig::default();
        retry.retry_timeout = Duration::ZERO;
        assert!(retry.validate().is_err());

        retry.retry_timeout = MAX_RETRY_TIMEOUT + Duration::from_secs(1);
        assert!(retry.validate().is_err());

        assert!(RetryConfig::aggressive().validate().is_ok());
    }

    #[test]
    fn test_json_output_uses_seconds() {
        let json = PlaybackConfig::default().to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["retry"]["retry_timeout"], 10.0);
        assert_eq!(value["quality"]["initial_quality"], "high");
    }
}
