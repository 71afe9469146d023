//! Core service façade for stream recovery.
//!
//! This crate wires the host-provided [`MediaPlayer`](bridge_traits::MediaPlayer)
//! and timer [`Scheduler`](core_async::scheduler::Scheduler) (bundled in a
//! [`CoreConfig`]) into a [`RecoveryService`]: interruptions reported by the
//! host start a retry producer, every retry reloads or degrades the stream,
//! and progress is published on the [`EventBus`](core_runtime::EventBus).
//!
//! ```ignore
//! use core_service::{CoreConfig, PlaybackConfig, RecoveryService};
//!
//! let config = CoreConfig::builder().media_player(player).build()?;
//! let service = RecoveryService::new(config, PlaybackConfig::default(), variants)?;
//! service.load_initial().await?;
//!
//! // From the host's stall/failure callback:
//! service.handle_interruption("playback stalled");
//! // From the host's "playing again" callback:
//! service.handle_recovered();
//! ```

pub mod error;
pub mod recovery;

pub use error::{CoreError, Result};
pub use recovery::RecoveryService;

pub use bridge_traits::{AudioSource, MediaPlayer, MediaTime};
pub use core_playback::{
    AudioQuality, PlaybackConfig, QualityConfig, RetryConfig, RetryEvent, SwitchOutcome,
};
pub use core_runtime::events::{CoreEvent, PlaybackEvent, QualityEvent, RecoveryEvent};
pub use core_runtime::{CoreConfig, FeatureFlags};
