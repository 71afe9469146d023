//! # Playback Recovery Module
//!
//! Building blocks for getting a stalled stream playing again:
//!
//! - [`retry`]: [`RetryEventProducer`], a timer-driven source of "try again
//!   now" events with a hard attempt limit
//! - [`quality`]: [`QualitySwitcher`], which swaps stream variants on the host
//!   player while keeping the playhead
//! - [`config`]: retry limits and quality policy (JSON via serde)
//!
//! The host's actual player is reached through
//! [`bridge_traits::MediaPlayer`]; timers come from a
//! [`core_async::scheduler::Scheduler`].

pub mod config;
pub mod error;
pub mod quality;
pub mod retry;

pub use config::{PlaybackConfig, QualityConfig, RetryConfig};
pub use error::{PlaybackError, Result};
pub use quality::{AudioQuality, QualitySwitcher, SwitchOutcome};
pub use retry::{ProducerId, RetryEvent, RetryEventListener, RetryEventProducer};
