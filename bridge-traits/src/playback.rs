//! Playback bridge traits and supporting item types.
//!
//! The host owns the real playback engine (AVFoundation, ExoPlayer, a desktop
//! audio stack). The core only needs enough control to swap the current item,
//! read and restore the playhead, and resume playback; everything else stays
//! on the host side of this boundary.

use crate::{error::Result, time::MediaTime};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// High-level audio source descriptor provided to the host player.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// Local file accessible to the host runtime.
    LocalFile { path: PathBuf },
    /// Remote HTTP(S) stream to be fetched by the host.
    RemoteStream {
        url: String,
        headers: HashMap<String, String>,
    },
    /// In-memory audio buffer supplied by the caller.
    MemoryBuffer { data: Bytes },
}

impl AudioSource {
    /// Convenience constructor for a remote stream without extra headers.
    pub fn remote(url: impl Into<String>) -> Self {
        AudioSource::RemoteStream {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::RemoteStream { .. })
    }

    /// Short description suitable for logs. Query strings are dropped because
    /// signed CDN URLs carry credentials there.
    pub fn log_label(&self) -> String {
        match self {
            AudioSource::LocalFile { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            AudioSource::RemoteStream { url, .. } => {
                url.split(['?', '#']).next().unwrap_or_default().to_string()
            }
            AudioSource::MemoryBuffer { data } => format!("memory:{}b", data.len()),
        }
    }
}

/// Unique identifier for an item handed to the host player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerItemId(Uuid);

impl PlayerItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlayerItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata surfaced to platform media sessions (lock screen, now playing).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackMetadata {
    pub track_id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Arbitrary extra fields (e.g., artwork URI, genre).
    pub extra: HashMap<String, String>,
}

/// A playable item. Every quality switch or reload produces a fresh item so
/// the host never reuses a failed pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerItem {
    pub id: PlayerItemId,
    pub source: AudioSource,
    /// Human-readable quality label (e.g. "high"), used by hosts that display
    /// the active stream variant.
    pub quality_label: Option<String>,
    pub metadata: PlaybackMetadata,
}

impl PlayerItem {
    pub fn new(source: AudioSource) -> Self {
        Self {
            id: PlayerItemId::new(),
            source,
            quality_label: None,
            metadata: PlaybackMetadata::default(),
        }
    }

    pub fn with_quality_label(mut self, label: impl Into<String>) -> Self {
        self.quality_label = Some(label.into());
        self
    }

    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Host media player the core drives during recovery and quality changes.
#[async_trait::async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Current playhead. Hosts return [`MediaTime::INVALID`] when nothing is
    /// loaded.
    async fn current_time(&self) -> Result<MediaTime>;

    /// Seek to an absolute position of the current item.
    async fn seek(&self, to: MediaTime) -> Result<()>;

    /// Replace the current item. Playback pauses until `play` is called.
    async fn replace_current_item(&self, item: PlayerItem) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Whether the player is actively rendering (rate > 0).
    async fn is_playing(&self) -> Result<bool>;
}
