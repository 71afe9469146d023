//! # Recovery Service
//!
//! Connects host interruption signals to the retry producer and turns each
//! retry event into a reload (or a quality step down) on the host player.
//!
//! ```text
//! host ──handle_interruption──> RetryEventProducer ──(timer)──> RetryForwarder
//!                                                                    │ mpsc
//!                                                                    v
//!        EventBus <──publish── event loop ──degrade/reload──> QualitySwitcher
//! ```
//!
//! The producer's listener only forwards into a channel; the async work of
//! talking to the host player happens on the service's event loop task.
//! Forwarded events are stamped with a recovery epoch. Starting or ending a
//! retry cycle bumps the epoch, so events still queued from an earlier cycle
//! never reach the player.

use crate::error::{CoreError, Result};
use bridge_traits::{AudioSource, Clock, PlayerItemId};
use core_async::runtime::Handle;
use core_async::sync::{mpsc, BlockingMutex, CancellationToken};
use core_async::task::JoinHandle;
use core_playback::{
    AudioQuality, PlaybackConfig, PlaybackError, ProducerId, QualityConfig, QualitySwitcher,
    RetryEvent, RetryEventListener, RetryEventProducer, SwitchOutcome,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, RecoveryEvent, Receiver};
use core_runtime::{CoreConfig, FeatureFlags};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

struct RetryMessage {
    epoch: u64,
    source: ProducerId,
    event: RetryEvent,
}

/// Producer listener that hands events to the event loop.
struct RetryForwarder {
    tx: mpsc::UnboundedSender<RetryMessage>,
    epoch: Arc<AtomicU64>,
}

impl RetryEventListener for RetryForwarder {
    fn on_retry_event(&self, source: ProducerId, event: RetryEvent) {
        let message = RetryMessage {
            epoch: self.epoch.load(Ordering::Acquire),
            source,
            event,
        };
        if self.tx.send(message).is_err() {
            debug!(producer_id = %source, "event loop gone, retry event dropped");
        }
    }
}

/// State shared between the service handle and its event loop.
struct ServiceInner {
    switcher: QualitySwitcher,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    features: FeatureFlags,
    quality: QualityConfig,
    producer: RetryEventProducer,
    epoch: Arc<AtomicU64>,
    /// Wall-clock millis of the first unrecovered interruption.
    outage_started_ms: BlockingMutex<Option<i64>>,
}

/// Drives stream recovery for one track.
///
/// Must be created inside a Tokio runtime; the event loop runs as a task on
/// it. Dropping the service stops the producer and the loop.
pub struct RecoveryService {
    inner: Arc<ServiceInner>,
    _forwarder: Arc<RetryForwarder>,
    cancel: CancellationToken,
    event_loop: BlockingMutex<Option<JoinHandle<()>>>,
}

impl RecoveryService {
    /// Builds the switcher and producer from `config` and starts the event
    /// loop.
    ///
    /// # Errors
    ///
    /// - `Runtime` / `Playback` when a configuration is invalid
    /// - `Playback(InvalidConfig)` when `variants` is empty
    /// - `InitializationFailed` outside of a Tokio runtime
    pub fn new(
        config: CoreConfig,
        playback: PlaybackConfig,
        variants: BTreeMap<AudioQuality, AudioSource>,
    ) -> Result<Self> {
        config.validate()?;
        playback.validate()?;

        let runtime = Handle::try_current().map_err(|_| {
            CoreError::InitializationFailed(
                "RecoveryService must be created inside a Tokio runtime".to_string(),
            )
        })?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let switcher = QualitySwitcher::new(Arc::clone(&config.media_player), variants)?
            .with_event_bus(event_bus.clone());

        let producer = RetryEventProducer::from_config(Arc::clone(&config.scheduler), &playback.retry);
        let epoch = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = Arc::new(RetryForwarder {
            tx,
            epoch: Arc::clone(&epoch),
        });
        producer.set_listener(&forwarder);

        info!(
            producer_id = %producer.id(),
            max_attempts = playback.retry.maximum_retry_count,
            timeout_ms = playback.retry.retry_timeout.as_millis() as u64,
            "recovery service started"
        );

        let inner = Arc::new(ServiceInner {
            switcher,
            event_bus,
            clock: Arc::clone(&config.clock),
            features: config.features,
            quality: playback.quality,
            producer,
            epoch,
            outage_started_ms: BlockingMutex::new(None),
        });

        let cancel = CancellationToken::new();
        let event_loop = runtime.spawn(run_event_loop(Arc::clone(&inner), rx, cancel.clone()));

        Ok(Self {
            inner,
            _forwarder: forwarder,
            cancel,
            event_loop: BlockingMutex::new(Some(event_loop)),
        })
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.inner.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    pub fn producer_id(&self) -> ProducerId {
        self.inner.producer.id()
    }

    /// `true` while retries are being produced.
    pub fn is_recovering(&self) -> bool {
        self.inner.producer.is_listening()
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.producer.retry_count()
    }

    pub async fn current_quality(&self) -> Option<AudioQuality> {
        self.inner.switcher.current_quality().await
    }

    /// Loads the configured initial quality.
    pub async fn load_initial(&self) -> Result<PlayerItemId> {
        self.load(self.inner.quality.initial_quality).await
    }

    pub async fn load(&self, quality: AudioQuality) -> Result<PlayerItemId> {
        Ok(self.inner.switcher.load(quality).await?)
    }

    pub async fn switch_quality(&self, quality: AudioQuality) -> Result<SwitchOutcome> {
        Ok(self.inner.switcher.switch_quality(quality).await?)
    }

    /// Reports a stall or failure of the current item. Starts retrying
    /// unless auto recovery is disabled; repeated calls while retrying only
    /// publish the interruption.
    #[instrument(skip(self, reason))]
    pub fn handle_interruption(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(reason = %reason, "playback interrupted");

        self.inner
            .outage_started_ms
            .lock()
            .get_or_insert_with(|| self.inner.clock.unix_timestamp_millis());

        self.inner
            .event_bus
            .publish(CoreEvent::Playback(PlaybackEvent::Interrupted { reason }));

        if !self.inner.features.enable_auto_recovery {
            debug!("auto recovery disabled, not retrying");
            return;
        }

        let producer = &self.inner.producer;
        if producer.start_producing_events() {
            self.inner.epoch.fetch_add(1, Ordering::AcqRel);
            self.inner
                .event_bus
                .publish(CoreEvent::Recovery(RecoveryEvent::RetryStarted {
                    producer_id: producer.id().to_string(),
                    interval_ms: producer.retry_timeout().as_millis() as u64,
                }));
        }
    }

    /// Reports that playback is running again. Stops retrying and publishes
    /// the outage length. Retry events already queued for the event loop are
    /// discarded and never touch the player.
    #[instrument(skip(self))]
    pub fn handle_recovered(&self) {
        let producer = &self.inner.producer;
        let attempts = producer.retry_count();
        let stopped = producer.stop_producing_events();
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);

        if stopped {
            self.inner
                .event_bus
                .publish(CoreEvent::Recovery(RecoveryEvent::RetryStopped {
                    producer_id: producer.id().to_string(),
                    attempts,
                }));
        }

        let started = self.inner.outage_started_ms.lock().take();
        let outage_ms = started
            .map(|start| (self.inner.clock.unix_timestamp_millis() - start).max(0) as u64)
            .unwrap_or(0);

        info!(outage_ms, attempts, "playback recovered");
        self.inner
            .event_bus
            .publish(CoreEvent::Playback(PlaybackEvent::Recovered {
                outage_ms,
                attempts,
            }));
    }

    /// Stops the producer and waits for the event loop to exit.
    pub async fn shutdown(&self) {
        self.inner.producer.stop_producing_events();
        self.cancel.cancel();

        let handle = self.event_loop.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(error = %err, "recovery event loop ended abnormally");
            }
        }
        debug!(producer_id = %self.inner.producer.id(), "recovery service shut down");
    }
}

impl Drop for RecoveryService {
    fn drop(&mut self) {
        self.inner.producer.stop_producing_events();
        self.cancel.cancel();
    }
}

impl fmt::Debug for RecoveryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryService")
            .field("producer", &self.inner.producer)
            .field("features", &self.inner.features)
            .field("quality", &self.inner.quality)
            .finish()
    }
}

// ============================================================================
// Event loop
// ============================================================================

async fn run_event_loop(
    inner: Arc<ServiceInner>,
    mut rx: mpsc::UnboundedReceiver<RetryMessage>,
    cancel: CancellationToken,
) {
    loop {
        core_async::select! {
            _ = cancel.cancelled() => break,
            message = rx.recv() => match message {
                Some(message) => inner.on_retry_event(message).await,
                None => break,
            },
        }
    }
    debug!("recovery event loop stopped");
}

impl ServiceInner {
    async fn on_retry_event(&self, message: RetryMessage) {
        let RetryMessage {
            epoch,
            source,
            event,
        } = message;
        if epoch != self.epoch.load(Ordering::Acquire) {
            debug!(producer_id = %source, ?event, "stale retry event dropped");
            return;
        }

        match event {
            RetryEvent::RetryAvailable {
                attempt,
                max_attempts,
            } => {
                info!(producer_id = %source, attempt, max_attempts, "retrying playback");
                self.event_bus
                    .publish(CoreEvent::Recovery(RecoveryEvent::RetryAvailable {
                        producer_id: source.to_string(),
                        attempt,
                        max_attempts,
                    }));

                if !self.producer.is_listening() {
                    debug!(attempt, "producer stopped, retry skipped");
                    return;
                }
                if let Err(err) = self.attempt_retry().await {
                    warn!(
                        attempt,
                        error = %err,
                        transient = err.is_transient(),
                        "retry attempt failed"
                    );
                    self.event_bus.publish(CoreEvent::Playback(PlaybackEvent::Error {
                        message: err.to_string(),
                        recoverable: true,
                    }));
                }
            }
            RetryEvent::RetryFailed { attempts } => {
                error!(producer_id = %source, attempts, "giving up on playback recovery");
                // The next interruption starts a new outage.
                self.outage_started_ms.lock().take();
                self.event_bus
                    .publish(CoreEvent::Recovery(RecoveryEvent::RetryFailed {
                        producer_id: source.to_string(),
                        attempts,
                    }));
                self.event_bus.publish(CoreEvent::Playback(PlaybackEvent::Error {
                    message: format!("playback could not be recovered after {} attempts", attempts),
                    recoverable: false,
                }));
            }
        }
    }

    /// Steps quality down when allowed, otherwise (or at the lowest variant)
    /// reloads the current one.
    async fn attempt_retry(&self) -> std::result::Result<SwitchOutcome, PlaybackError> {
        if self.quality.degrade_on_retry && self.features.enable_quality_degradation {
            if let Some(outcome) = self.switcher.degrade().await? {
                return Ok(outcome);
            }
        }
        self.switcher.reload().await
    }
}
