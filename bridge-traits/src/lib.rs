//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the recovery core and the host's
//! playback stack. The host keeps ownership of decoding, buffering and network
//! streaming; the core only steers it through these traits.
//!
//! ## Traits
//!
//! - [`MediaPlayer`](playback::MediaPlayer) - Swap items, read/restore the playhead, resume
//! - [`Clock`](time::Clock) - Wall-clock source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Types
//!
//! - [`MediaTime`](time::MediaTime) - Rational media time with seconds/`Duration` conversions
//! - [`PlayerItem`](playback::PlayerItem) / [`AudioSource`](playback::AudioSource) - What the host should play
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Host implementations
//! should convert platform errors into it with actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind an `Arc`.

pub mod error;
pub mod playback;
pub mod time;

pub use error::BridgeError;

pub use playback::{AudioSource, MediaPlayer, PlaybackMetadata, PlayerItem, PlayerItemId};
pub use time::{
    format_clock, Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, MediaTime, MediaTimeKind,
    SystemClock, DEFAULT_TIMESCALE,
};
