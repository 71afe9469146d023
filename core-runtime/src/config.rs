//! # Core Configuration Module
//!
//! Provides configuration management for the stream recovery core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and runtime settings the core needs.
//! It enforces fail-fast validation so a missing capability is reported at
//! startup rather than on the first interruption.
//!
//! ## Required Dependencies
//!
//! - `MediaPlayer` - The host player the core steers during recovery
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Scheduler` - Timer source for retry events (default: `TokioScheduler`
//!   on the runtime the builder runs on)
//! - `Clock` - Wall clock for outage measurement (default: `SystemClock`)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_player(Arc::new(MyAvPlayerBridge::new()))
//!     .event_buffer_size(256)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No MediaPlayer was injected
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, MediaPlayer, SystemClock};
use core_async::scheduler::{Scheduler, TokioScheduler};
use std::fmt;
use std::sync::Arc;

/// Upper bound for the event bus buffer; beyond this a lagging subscriber
/// would hold an unreasonable amount of memory.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the stream recovery core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Host media player (required)
    pub media_player: Arc<dyn MediaPlayer>,

    /// Timer source for retry events
    pub scheduler: Arc<dyn Scheduler>,

    /// Wall clock used to measure outages
    pub clock: Arc<dyn Clock>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    /// Feature flags
    pub features: FeatureFlags,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_player", &"MediaPlayer { ... }")
            .field("scheduler", &"Scheduler { ... }")
            .field("clock", &"Clock { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional behaviour of the recovery service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Start retrying automatically when the host reports an interruption.
    /// When disabled, interruptions are only published on the event bus.
    pub enable_auto_recovery: bool,

    /// Allow the service to step down stream quality while retrying.
    pub enable_quality_degradation: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_auto_recovery: true,
            enable_quality_degradation: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

fn media_player_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaPlayer".to_string(),
        message: "A MediaPlayer implementation is required to reload and switch items. \
                 iOS/macOS: wrap AVPlayer. Android: wrap ExoPlayer. \
                 Desktop: wrap the host audio engine."
            .to_string(),
    }
}

fn provide_default_scheduler() -> Result<Arc<dyn Scheduler>> {
    match TokioScheduler::current() {
        Some(scheduler) => Ok(Arc::new(scheduler)),
        None => Err(Error::CapabilityMissing {
            capability: "Scheduler".to_string(),
            message: "No Scheduler provided and no Tokio runtime is running. \
                     Build the config inside a runtime or inject a Scheduler \
                     driven by the host run loop."
                .to_string(),
        }),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    media_player: Option<Arc<dyn MediaPlayer>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the host media player (required).
    pub fn media_player(mut self, player: Arc<dyn MediaPlayer>) -> Self {
        self.media_player = Some(player);
        self
    }

    /// Sets the timer source for retry events.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets the wall clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the per-subscriber event buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_auto_recovery(mut self, enabled: bool) -> Self {
        self.features.enable_auto_recovery = enabled;
        self
    }

    pub fn enable_quality_degradation(mut self, enabled: bool) -> Self {
        self.features.enable_quality_degradation = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when no `MediaPlayer` was provided, or no
    ///   `Scheduler` was provided outside of a Tokio runtime
    /// - `Config` when a setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let media_player = self.media_player.ok_or_else(media_player_missing_error)?;

        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => provide_default_scheduler()?,
        };

        let config = CoreConfig {
            media_player,
            scheduler,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{MediaTime, PlayerItem};
    use core_async::scheduler::ManualScheduler;

    struct NullPlayer;

    #[async_trait]
    impl MediaPlayer for NullPlayer {
        async fn current_time(&self) -> BridgeResult<MediaTime> {
            Ok(MediaTime::INVALID)
        }

        async fn seek(&self, _to: MediaTime) -> BridgeResult<()> {
            Ok(())
        }

        async fn replace_current_item(&self, _item: PlayerItem) -> BridgeResult<()> {
            Ok(())
        }

        async fn play(&self) -> BridgeResult<()> {
            Ok(())
        }

        async fn pause(&self) -> BridgeResult<()> {
            Ok(())
        }

        async fn is_playing(&self) -> BridgeResult<bool> {
            Ok(false)
        }
    }

    fn manual_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .media_player(Arc::new(NullPlayer))
            .scheduler(Arc::new(ManualScheduler::new()))
    }

    #[test]
    fn test_builder_requires_media_player() {
        let result = CoreConfig::builder()
            .scheduler(Arc::new(ManualScheduler::new()))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "MediaPlayer");
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_builder_requires_scheduler_outside_runtime() {
        let result = CoreConfig::builder()
            .media_player(Arc::new(NullPlayer))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "Scheduler"
        ));
    }

    #[tokio::test]
    async fn test_builder_defaults_scheduler_inside_runtime() {
        let config = CoreConfig::builder()
            .media_player(Arc::new(NullPlayer))
            .build()
            .expect("runtime scheduler should be picked up");

        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.features, FeatureFlags::default());
    }

    #[test]
    fn test_builder_with_all_options() {
        let config = manual_builder()
            .clock(Arc::new(SystemClock))
            .event_buffer_size(32)
            .enable_auto_recovery(false)
            .enable_quality_degradation(false)
            .build()
            .unwrap();

        assert_eq!(config.event_buffer_size, 32);
        assert!(!config.features.enable_auto_recovery);
        assert!(!config.features.enable_quality_degradation);
    }

    #[test]
    fn test_event_buffer_bounds() {
        assert!(manual_builder().event_buffer_size(0).build().is_err());
        assert!(manual_builder()
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build()
            .is_err());
        assert!(manual_builder()
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE)
            .build()
            .is_ok());
    }

    #[test]
    fn test_features_setter() {
        let features = FeatureFlags {
            enable_auto_recovery: false,
            enable_quality_degradation: true,
        };
        let config = manual_builder().features(features).build().unwrap();
        assert_eq!(config.features, features);
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = manual_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("MediaPlayer { ... }"));
        assert!(debug.contains("event_buffer_size"));
    }
}
