//! # Retry Event Producer
//!
//! Timer-driven state machine that tells a listener, once per
//! `retry_timeout`, that a retry should be attempted. After
//! `maximum_retry_count` firings it reports [`RetryEvent::RetryFailed`] once
//! and goes idle until restarted.
//!
//! ```text
//! Idle ──start──> Listening(0) ──fire──> Listening(1) ──fire──> ... ──fire──> Idle
//!   ^                 │          RetryAvailable          RetryAvailable   RetryFailed
//!   └──────stop───────┘
//! ```
//!
//! ## Timers
//!
//! Firings are one-shot callbacks on a [`Scheduler`]; each firing that keeps
//! the producer alive arms the next one. Every arm is tagged with a
//! generation number, and a firing whose generation is stale is ignored, so
//! `stop_producing_events` invalidates a callback that is already queued on
//! the scheduler.
//!
//! ## Listener
//!
//! The listener is held as a `Weak` reference: the producer never keeps it
//! alive. Events produced after the listener was dropped are discarded while
//! the timer keeps running. The listener is invoked outside of the producer's
//! lock and may call back into the producer (e.g. to stop it).
//!
//! ## Usage
//!
//! ```
//! use core_async::scheduler::ManualScheduler;
//! use core_playback::retry::{ProducerId, RetryEvent, RetryEventListener, RetryEventProducer};
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct Log(Mutex<Vec<RetryEvent>>);
//!
//! impl RetryEventListener for Log {
//!     fn on_retry_event(&self, _source: ProducerId, event: RetryEvent) {
//!         self.0.lock().push(event);
//!     }
//! }
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let producer = RetryEventProducer::new(scheduler.clone());
//! producer.set_maximum_retry_count(3);
//! producer.set_retry_timeout(Duration::from_secs(1));
//!
//! let log = Arc::new(Log::default());
//! producer.set_listener(&log);
//! producer.start_producing_events();
//!
//! scheduler.advance(Duration::from_secs(5));
//! assert_eq!(log.0.lock().len(), 3);
//! assert!(!producer.is_listening());
//! ```

use crate::config::{RetryConfig, DEFAULT_MAXIMUM_RETRY_COUNT, DEFAULT_RETRY_TIMEOUT};
use core_async::scheduler::{ScheduledTask, Scheduler};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};
use uuid::Uuid;

// ============================================================================
// Identifiers & Events
// ============================================================================

/// Identity of a producer, delivered with every event so one listener can
/// serve several producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProducerId(Uuid);

impl ProducerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProducerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signal emitted by a [`RetryEventProducer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RetryEvent {
    /// A retry should be attempted now.
    RetryAvailable {
        /// 1-based number of this attempt.
        attempt: u32,
        max_attempts: u32,
    },
    /// The attempt limit was reached. Emitted once; the producer is idle
    /// afterwards.
    RetryFailed { attempts: u32 },
}

impl RetryEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryEvent::RetryFailed { .. })
    }
}

/// Receiver of retry events.
///
/// Called from the scheduler's context (a Tokio task for `TokioScheduler`,
/// the caller of `advance` for `ManualScheduler`). Implementations must not
/// block; forward to a channel when real work is needed.
pub trait RetryEventListener: Send + Sync {
    fn on_retry_event(&self, source: ProducerId, event: RetryEvent);
}

// ============================================================================
// Producer
// ============================================================================

struct ProducerState {
    retry_count: u32,
    maximum_retry_count: u32,
    retry_timeout: Duration,
    listening: bool,
    generation: u64,
    timer: Option<ScheduledTask>,
    listener: Option<Weak<dyn RetryEventListener>>,
}

struct Shared {
    id: ProducerId,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<ProducerState>,
}

/// Emits [`RetryEvent`]s at a fixed interval until a maximum count.
///
/// Dropping the producer stops it and cancels its pending timer.
pub struct RetryEventProducer {
    shared: Arc<Shared>,
}

impl RetryEventProducer {
    /// Producer with the default limits (10 attempts, 10 seconds apart).
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self::with_limits(scheduler, DEFAULT_MAXIMUM_RETRY_COUNT, DEFAULT_RETRY_TIMEOUT)
    }

    pub fn from_config(scheduler: Arc<dyn Scheduler>, config: &RetryConfig) -> Self {
        Self::with_limits(scheduler, config.maximum_retry_count, config.retry_timeout)
    }

    fn with_limits(
        scheduler: Arc<dyn Scheduler>,
        maximum_retry_count: u32,
        retry_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: ProducerId::new(),
                scheduler,
                state: Mutex::new(ProducerState {
                    retry_count: 0,
                    maximum_retry_count,
                    retry_timeout,
                    listening: false,
                    generation: 0,
                    timer: None,
                    listener: None,
                }),
            }),
        }
    }

    pub fn id(&self) -> ProducerId {
        self.shared.id
    }

    /// Number of firings since the last start.
    pub fn retry_count(&self) -> u32 {
        self.shared.state.lock().retry_count
    }

    pub fn is_listening(&self) -> bool {
        self.shared.state.lock().listening
    }

    pub fn maximum_retry_count(&self) -> u32 {
        self.shared.state.lock().maximum_retry_count
    }

    /// Takes effect at the next firing.
    pub fn set_maximum_retry_count(&self, count: u32) {
        self.shared.state.lock().maximum_retry_count = count;
    }

    pub fn retry_timeout(&self) -> Duration {
        self.shared.state.lock().retry_timeout
    }

    /// Takes effect the next time a timer is armed.
    pub fn set_retry_timeout(&self, timeout: Duration) {
        self.shared.state.lock().retry_timeout = timeout;
    }

    /// Registers the listener without taking ownership of it.
    pub fn set_listener<L>(&self, listener: &Arc<L>)
    where
        L: RetryEventListener + 'static,
    {
        let weak: Weak<L> = Arc::downgrade(listener);
        let weak: Weak<dyn RetryEventListener> = weak;
        self.shared.state.lock().listener = Some(weak);
    }

    pub fn clear_listener(&self) {
        self.shared.state.lock().listener = None;
    }

    /// Starts emitting events. No-op while already listening; otherwise the
    /// retry count is reset and the first timer is armed.
    ///
    /// Returns `true` when this call started a new cycle.
    pub fn start_producing_events(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.listening {
            trace!(producer_id = %self.shared.id, "start ignored: already listening");
            return false;
        }

        state.retry_count = 0;
        state.listening = true;
        state.generation = state.generation.wrapping_add(1);
        arm(&self.shared, &mut state);

        debug!(
            producer_id = %self.shared.id,
            max_attempts = state.maximum_retry_count,
            timeout_ms = state.retry_timeout.as_millis() as u64,
            "retry producer started"
        );
        true
    }

    /// Stops emitting events and cancels the pending timer. No-op when not
    /// listening. A firing already queued on the scheduler is discarded.
    ///
    /// Returns `true` when this call ended a running cycle.
    pub fn stop_producing_events(&self) -> bool {
        let mut state = self.shared.state.lock();
        if !state.listening {
            return false;
        }

        state.listening = false;
        state.generation = state.generation.wrapping_add(1);
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }

        debug!(
            producer_id = %self.shared.id,
            retry_count = state.retry_count,
            "retry producer stopped"
        );
        true
    }
}

impl Drop for RetryEventProducer {
    fn drop(&mut self) {
        self.stop_producing_events();
    }
}

impl fmt::Debug for RetryEventProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("RetryEventProducer")
            .field("id", &self.shared.id)
            .field("retry_count", &state.retry_count)
            .field("maximum_retry_count", &state.maximum_retry_count)
            .field("retry_timeout", &state.retry_timeout)
            .field("listening", &state.listening)
            .finish()
    }
}

/// Replaces the pending timer with a new one for the current generation.
fn arm(shared: &Arc<Shared>, state: &mut ProducerState) {
    if let Some(previous) = state.timer.take() {
        previous.cancel();
    }

    let generation = state.generation;
    let weak = Arc::downgrade(shared);
    let task = shared.scheduler.schedule(
        state.retry_timeout,
        Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                on_timer_fired(&shared, generation);
            }
        }),
    );
    state.timer = Some(task);
}

fn on_timer_fired(shared: &Arc<Shared>, generation: u64) {
    let (listener, event) = {
        let mut state = shared.state.lock();
        if !state.listening || state.generation != generation {
            trace!(producer_id = %shared.id, generation, "stale retry timer ignored");
            return;
        }

        state.retry_count = state.retry_count.saturating_add(1);

        let event = if state.retry_count < state.maximum_retry_count {
            arm(shared, &mut state);
            RetryEvent::RetryAvailable {
                attempt: state.retry_count,
                max_attempts: state.maximum_retry_count,
            }
        } else {
            state.listening = false;
            state.generation = state.generation.wrapping_add(1);
            // The handle belongs to the callback running right now.
            state.timer = None;
            warn!(
                producer_id = %shared.id,
                attempts = state.retry_count,
                "retry attempts exhausted"
            );
            RetryEvent::RetryFailed {
                attempts: state.retry_count,
            }
        };

        (state.listener.as_ref().and_then(Weak::upgrade), event)
    };

    match listener {
        Some(listener) => listener.on_retry_event(shared.id, event),
        None => trace!(producer_id = %shared.id, ?event, "no listener, retry event discarded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_async::scheduler::ManualScheduler;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(ProducerId, RetryEvent)>>,
    }

    impl RetryEventListener for Recorder {
        fn on_retry_event(&self, source: ProducerId, event: RetryEvent) {
            self.events.lock().push((source, event));
        }
    }

    fn setup(max: u32) -> (Arc<ManualScheduler>, RetryEventProducer, Arc<Recorder>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let producer = RetryEventProducer::new(scheduler.clone());
        producer.set_maximum_retry_count(max);
        producer.set_retry_timeout(Duration::from_secs(1));
        let recorder = Arc::new(Recorder::default());
        producer.set_listener(&recorder);
        (scheduler, producer, recorder)
    }

    #[test]
    fn test_defaults() {
        let producer = RetryEventProducer::new(Arc::new(ManualScheduler::new()));
        assert_eq!(producer.maximum_retry_count(), 10);
        assert_eq!(producer.retry_timeout(), Duration::from_secs(10));
        assert_eq!(producer.retry_count(), 0);
        assert!(!producer.is_listening());
    }

    #[test]
    fn test_events_carry_producer_id() {
        let (scheduler, producer, recorder) = setup(3);
        producer.start_producing_events();
        scheduler.advance(Duration::from_secs(1));

        let events = recorder.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, producer.id());
        assert_eq!(
            events[0].1,
            RetryEvent::RetryAvailable {
                attempt: 1,
                max_attempts: 3
            }
        );
    }

    #[test]
    fn test_no_fire_before_timeout() {
        let (scheduler, producer, recorder) = setup(3);
        producer.start_producing_events();
        scheduler.advance(Duration::from_millis(999));
        assert!(recorder.events.lock().is_empty());
        assert_eq!(producer.retry_count(), 0);
    }

    #[test]
    fn test_timeout_change_applies_on_next_arm() {
        let (scheduler, producer, recorder) = setup(5);
        producer.start_producing_events();
        producer.set_retry_timeout(Duration::from_secs(3));

        // Already armed with 1s.
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(recorder.events.lock().len(), 1);

        // Re-armed with 3s.
        scheduler.advance(Duration::from_secs(2));
        assert_eq!(recorder.events.lock().len(), 1);
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(recorder.events.lock().len(), 2);
    }

    #[test]
    fn test_maximum_zero_fails_on_first_fire() {
        let (scheduler, producer, recorder) = setup(0);
        producer.start_producing_events();
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(
            recorder.events.lock().as_slice(),
            &[(producer.id(), RetryEvent::RetryFailed { attempts: 1 })]
        );
    }

    #[test]
    fn test_debug_output() {
        let (_scheduler, producer, _recorder) = setup(3);
        let debug = format!("{:?}", producer);
        assert!(debug.contains("maximum_retry_count: 3"));
        assert!(debug.contains("listening: false"));
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(RetryEvent::RetryFailed { attempts: 4 }).unwrap();
        assert_eq!(json["event"], "RetryFailed");
        assert_eq!(json["attempts"], 4);
        assert!(RetryEvent::RetryFailed { attempts: 4 }.is_terminal());
    }
}
