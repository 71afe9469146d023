//! # Quality Switching
//!
//! Swaps the host player's item between stream variants of the same track
//! while keeping the playhead and play/pause state.
//!
//! Each switch hands the player a fresh [`PlayerItem`]; the player is asked
//! for its position and play state first, then the new item is attached,
//! seeked and resumed. Switches are serialized: a second switch waits until
//! the first one has finished talking to the host.

use crate::error::{PlaybackError, Result};
use bridge_traits::{
    AudioSource, MediaPlayer, MediaTime, PlaybackMetadata, PlayerItem, PlayerItemId,
};
use core_async::sync::{Mutex, MutexGuard};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, QualityEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ============================================================================
// AudioQuality
// ============================================================================

/// Stream quality levels, ordered from lowest to highest bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,
    Normal,
    High,
    Lossless,
}

impl AudioQuality {
    pub const ALL: [AudioQuality; 4] = [
        AudioQuality::Low,
        AudioQuality::Normal,
        AudioQuality::High,
        AudioQuality::Lossless,
    ];

    /// Nominal bitrate in kbit/s.
    pub fn bitrate_kbps(&self) -> u32 {
        match self {
            AudioQuality::Low => 64,
            AudioQuality::Normal => 128,
            AudioQuality::High => 320,
            AudioQuality::Lossless => 1411,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioQuality::Low => "low",
            AudioQuality::Normal => "normal",
            AudioQuality::High => "high",
            AudioQuality::Lossless => "lossless",
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioQuality {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self> {
        AudioQuality::ALL
            .into_iter()
            .find(|quality| quality.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlaybackError::InvalidConfig(format!("unknown quality: {}", s)))
    }
}

/// Result of a quality operation that touched (or declined to touch) the
/// player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The requested quality was already active.
    Unchanged,
    /// A different variant was attached at `position`.
    Switched {
        from: AudioQuality,
        to: AudioQuality,
        position: MediaTime,
    },
    /// The active variant was re-attached at `position`.
    Reloaded {
        quality: AudioQuality,
        position: MediaTime,
    },
}

// ============================================================================
// QualitySwitcher
// ============================================================================

/// Moves a [`MediaPlayer`] between the registered variants of one track.
pub struct QualitySwitcher {
    player: Arc<dyn MediaPlayer>,
    variants: BTreeMap<AudioQuality, AudioSource>,
    metadata: PlaybackMetadata,
    event_bus: Option<EventBus>,
    current: Mutex<Option<AudioQuality>>,
}

impl QualitySwitcher {
    /// # Errors
    ///
    /// `InvalidConfig` when `variants` is empty.
    pub fn new(
        player: Arc<dyn MediaPlayer>,
        variants: BTreeMap<AudioQuality, AudioSource>,
    ) -> Result<Self> {
        if variants.is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "at least one stream variant is required".to_string(),
            ));
        }

        Ok(Self {
            player,
            variants,
            metadata: PlaybackMetadata::default(),
            event_bus: None,
            current: Mutex::new(None),
        })
    }

    /// Publish quality and load events on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Metadata attached to every item handed to the player.
    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn available_qualities(&self) -> impl Iterator<Item = AudioQuality> + '_ {
        self.variants.keys().copied()
    }

    /// The variant currently attached to the player, if any.
    pub async fn current_quality(&self) -> Option<AudioQuality> {
        *self.current.lock().await
    }

    /// Attaches `quality` from the start, without seeking.
    #[instrument(skip(self))]
    pub async fn load(&self, quality: AudioQuality) -> Result<PlayerItemId> {
        let mut current = self.current.lock().await;
        let item = self.item_for(quality)?;
        let item_id = item.id;

        self.player.replace_current_item(item).await?;
        let previous = current.replace(quality);

        info!(item_id = %item_id, "player item loaded");
        self.publish(CoreEvent::Playback(PlaybackEvent::ItemLoaded {
            item_id: item_id.to_string(),
            quality: quality.to_string(),
        }));
        if previous != Some(quality) {
            self.publish(CoreEvent::Quality(QualityEvent::Changed {
                from: previous.map(|q| q.to_string()),
                to: quality.to_string(),
                position_ms: 0,
            }));
        }

        Ok(item_id)
    }

    /// Switches to `quality` at the current playhead.
    ///
    /// # Errors
    ///
    /// - `QualityUnavailable` when no variant is registered for `quality`
    /// - `NoItemLoaded` before the first [`load`](Self::load)
    /// - `Bridge` when the host fails one of the steps
    #[instrument(skip(self))]
    pub async fn switch_quality(&self, quality: AudioQuality) -> Result<SwitchOutcome> {
        let mut current = self.current.lock().await;
        self.switch_locked(&mut current, quality).await
    }

    /// Re-attaches the active variant at the current playhead, giving the
    /// host a fresh pipeline for the same stream.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<SwitchOutcome> {
        let current = self.current.lock().await;
        let quality = current.ok_or(PlaybackError::NoItemLoaded)?;

        let position = self.reattach(quality).await?;
        debug!(quality = %quality, position = %position, "player item reloaded");

        Ok(SwitchOutcome::Reloaded { quality, position })
    }

    /// Switches to the next lower registered variant.
    ///
    /// Returns `Ok(None)` without touching the player when the lowest
    /// variant is already active. The neighbour is picked and switched to
    /// under one lock, so a concurrent switch cannot land in between.
    pub async fn degrade(&self) -> Result<Option<SwitchOutcome>> {
        let mut current = self.current.lock().await;
        let active = current.ok_or(PlaybackError::NoItemLoaded)?;

        match self.variants.range(..active).next_back() {
            Some((&lower, _)) => self.switch_locked(&mut current, lower).await.map(Some),
            None => {
                debug!(quality = %active, "no lower quality to degrade to");
                self.publish(CoreEvent::Quality(QualityEvent::DegradationExhausted {
                    quality: active.to_string(),
                }));
                Ok(None)
            }
        }
    }

    /// Switches to the next higher registered variant, `Ok(None)` at the top.
    pub async fn upgrade(&self) -> Result<Option<SwitchOutcome>> {
        let mut current = self.current.lock().await;
        let active = current.ok_or(PlaybackError::NoItemLoaded)?;

        match self
            .variants
            .range((Bound::Excluded(active), Bound::Unbounded))
            .next()
        {
            Some((&higher, _)) => self.switch_locked(&mut current, higher).await.map(Some),
            None => Ok(None),
        }
    }

    async fn switch_locked(
        &self,
        current: &mut MutexGuard<'_, Option<AudioQuality>>,
        quality: AudioQuality,
    ) -> Result<SwitchOutcome> {
        if !self.variants.contains_key(&quality) {
            return Err(PlaybackError::QualityUnavailable(quality));
        }
        let from = current.ok_or(PlaybackError::NoItemLoaded)?;
        if from == quality {
            return Ok(SwitchOutcome::Unchanged);
        }

        let position = self.reattach(quality).await?;
        **current = Some(quality);

        info!(from = %from, to = %quality, position = %position, "stream quality switched");
        self.publish(CoreEvent::Quality(QualityEvent::Changed {
            from: Some(from.to_string()),
            to: quality.to_string(),
            position_ms: position_millis(&position),
        }));

        Ok(SwitchOutcome::Switched {
            from,
            to: quality,
            position,
        })
    }

    /// Replaces the item with `quality` and restores position and play
    /// state. Returns the captured position.
    async fn reattach(&self, quality: AudioQuality) -> Result<MediaTime> {
        let item = self.item_for(quality)?;
        let (position, was_playing) =
            futures::try_join!(self.player.current_time(), self.player.is_playing())?;

        self.player.replace_current_item(item).await?;

        if position.seconds().is_some_and(|secs| secs > 0.0) {
            self.player.seek(position).await?;
        }
        if was_playing {
            self.player.play().await?;
        }

        Ok(position)
    }

    fn item_for(&self, quality: AudioQuality) -> Result<PlayerItem> {
        let source = self
            .variants
            .get(&quality)
            .ok_or(PlaybackError::QualityUnavailable(quality))?;

        Ok(PlayerItem::new(source.clone())
            .with_quality_label(quality.as_str())
            .with_metadata(self.metadata.clone()))
    }

    fn publish(&self, event: CoreEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

impl fmt::Debug for QualitySwitcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QualitySwitcher")
            .field("variants", &self.variants.keys().collect::<Vec<_>>())
            .field("has_event_bus", &self.event_bus.is_some())
            .finish()
    }
}

fn position_millis(position: &MediaTime) -> u64 {
    position
        .to_duration()
        .map_or(0, |duration| duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_ordering_and_bitrates() {
        assert!(AudioQuality::Low < AudioQuality::Normal);
        assert!(AudioQuality::High < AudioQuality::Lossless);
        let bitrates: Vec<u32> = AudioQuality::ALL.iter().map(|q| q.bitrate_kbps()).collect();
        assert_eq!(bitrates, vec![64, 128, 320, 1411]);
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!("HIGH".parse::<AudioQuality>().unwrap(), AudioQuality::High);
        assert_eq!("lossless".parse::<AudioQuality>().unwrap(), AudioQuality::Lossless);
        assert!("ultra".parse::<AudioQuality>().is_err());
    }

    #[test]
    fn test_quality_serde_names() {
        assert_eq!(serde_json::to_string(&AudioQuality::Normal).unwrap(), "\"normal\"");
        let parsed: AudioQuality = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, AudioQuality::Low);
    }

    #[test]
    fn test_position_millis() {
        assert_eq!(position_millis(&MediaTime::new(900, 600)), 1_500);
        assert_eq!(position_millis(&MediaTime::INVALID), 0);
    }
}
