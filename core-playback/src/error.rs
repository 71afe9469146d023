//! # Playback Error Types
//!
//! Errors raised while steering the host player through reloads and quality
//! switches.

use crate::quality::AudioQuality;
use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during recovery and quality operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A configuration value is out of range or inconsistent.
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),

    /// The configuration document could not be parsed.
    #[error("Failed to parse playback configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    // ========================================================================
    // Quality Errors
    // ========================================================================
    /// No stream variant is registered for the requested quality.
    #[error("Quality not available: {0}")]
    QualityUnavailable(AudioQuality),

    /// Attempted a switch or reload before anything was loaded.
    #[error("No item loaded")]
    NoItemLoaded,

    // ========================================================================
    // Host Errors
    // ========================================================================
    /// The host player rejected or failed an operation.
    #[error("Host player error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the operation can be retried (typically on the next
    /// retry event).
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Bridge(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let network = PlaybackError::from(BridgeError::OperationFailed("timeout".into()));
        assert!(network.is_transient());

        let rejected = PlaybackError::from(BridgeError::ItemRejected("bad codec".into()));
        assert!(!rejected.is_transient());

        assert!(!PlaybackError::NoItemLoaded.is_transient());
        assert!(!PlaybackError::QualityUnavailable(AudioQuality::Lossless).is_transient());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            PlaybackError::QualityUnavailable(AudioQuality::High).to_string(),
            "Quality not available: high"
        );
    }
}
