//! # Event Bus System
//!
//! Typed events published by the recovery core over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps one enum per domain (recovery,
//!   quality, playback)
//! - **EventBus**: broadcast sender; clone it to publish from several places
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! ```text
//! ┌──────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ RecoveryService  ├────────>│ EventBus  ├────────────>│ UI / host  │
//! └──────────────────┘         │ (broadcast│             └────────────┘
//! ┌──────────────────┐  emit   │  channel) │  subscribe  ┌────────────┐
//! │ QualitySwitcher  ├────────>│           ├────────────>│ Analytics  │
//! └──────────────────┘         └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, RecoveryEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut sub = bus.subscribe();
//!
//! bus.emit(CoreEvent::Recovery(RecoveryEvent::RetryAvailable {
//!     producer_id: "p-1".to_string(),
//!     attempt: 1,
//!     max_attempts: 10,
//! }))
//! .ok();
//!
//! let event = sub.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Recovery(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender was dropped; treat it as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Retry/backoff events
    Recovery(RecoveryEvent),
    /// Stream quality changes
    Quality(QualityEvent),
    /// Playback lifecycle events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Recovery(e) => e.description(),
            CoreEvent::Quality(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Recovery(RecoveryEvent::RetryFailed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Error { recoverable, .. }) => {
                if *recoverable {
                    EventSeverity::Warning
                } else {
                    EventSeverity::Error
                }
            }
            CoreEvent::Playback(PlaybackEvent::Interrupted { .. }) => EventSeverity::Warning,
            CoreEvent::Quality(QualityEvent::DegradationExhausted { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Playback(PlaybackEvent::Recovered { .. }) => EventSeverity::Info,
            CoreEvent::Quality(QualityEvent::Changed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Recovery Events
// ============================================================================

/// Events emitted by the retry producer, as seen by bus subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RecoveryEvent {
    /// The producer armed its first timer.
    RetryStarted {
        producer_id: String,
        /// Delay between attempts, in milliseconds.
        interval_ms: u64,
    },
    /// A retry should be attempted now.
    RetryAvailable {
        producer_id: String,
        /// 1-based attempt number.
        attempt: u32,
        max_attempts: u32,
    },
    /// The maximum number of attempts was reached; the consumer should give up.
    RetryFailed {
        producer_id: String,
        attempts: u32,
    },
    /// Retrying stopped before the limit, e.g. because playback recovered.
    RetryStopped {
        producer_id: String,
        attempts: u32,
    },
}

impl RecoveryEvent {
    fn description(&self) -> &str {
        match self {
            RecoveryEvent::RetryStarted { .. } => "Retrying started",
            RecoveryEvent::RetryAvailable { .. } => "Retry available",
            RecoveryEvent::RetryFailed { .. } => "Retry attempts exhausted",
            RecoveryEvent::RetryStopped { .. } => "Retrying stopped",
        }
    }
}

// ============================================================================
// Quality Events
// ============================================================================

/// Events related to stream quality selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QualityEvent {
    /// The player item was swapped for another quality variant.
    Changed {
        /// Previous quality name, `None` on first load.
        from: Option<String>,
        to: String,
        /// Position the new item resumed at (milliseconds).
        position_ms: u64,
    },
    /// A degrade was requested while already on the lowest variant.
    DegradationExhausted {
        quality: String,
    },
}

impl QualityEvent {
    fn description(&self) -> &str {
        match self {
            QualityEvent::Changed { .. } => "Stream quality changed",
            QualityEvent::DegradationExhausted { .. } => "Already at lowest quality",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the playback session being recovered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new item was handed to the host player.
    ItemLoaded {
        item_id: String,
        quality: String,
    },
    /// The host reported a stall or failure of the current item.
    Interrupted {
        reason: String,
    },
    /// Playback resumed after an interruption.
    Recovered {
        /// Time between interruption and recovery (milliseconds).
        outage_ms: u64,
        /// Retry attempts made before recovering.
        attempts: u32,
    },
    /// Playback error occurred.
    Error {
        message: String,
        /// Whether playback can be retried.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::ItemLoaded { .. } => "Player item loaded",
            PlaybackEvent::Interrupted { .. } => "Playback interrupted",
            PlaybackEvent::Recovered { .. } => "Playback recovered",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every `subscribe()` creates an
/// independent receiver that sees events published after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus; `capacity` is the per-subscriber backlog
    /// before `RecvError::Lagged` is reported.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Publishes an event, ignoring the no-subscriber case.
    pub fn publish(&self, event: CoreEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let recovery_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Recovery(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
