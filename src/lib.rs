//! Workspace umbrella crate.
//!
//! Host applications can depend on `stream-recovery` and pick a feature instead
//! of wiring each workspace crate individually:
//!
//! - `service` (default): the full [`RecoveryService`](core_service::RecoveryService)
//!   façade with event bus, retry producer and quality switching.
//! - `playback-only`: just the building blocks from `core-playback`.

#[cfg(feature = "service")]
pub use core_service::*;

#[cfg(all(feature = "playback-only", not(feature = "service")))]
pub use core_playback::*;
