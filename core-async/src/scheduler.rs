//! Cancellable one-shot delayed callbacks.
//!
//! A [`Scheduler`] runs a boxed closure once after a delay and hands back a
//! [`ScheduledTask`] that can cancel it. There is no repeat mode: periodic
//! behaviour is expressed by re-arming from inside the callback, which keeps
//! exactly one pending callback per owner.
//!
//! Two implementations are provided:
//!
//! - [`TokioScheduler`] spawns a sleeping task on a Tokio runtime.
//! - [`ManualScheduler`] keeps a virtual clock that only moves when
//!   [`ManualScheduler::advance`] is called. Tests and hosts that drive their
//!   own run loop use it to fire timers deterministically.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::trace;

/// Callback run by a [`Scheduler`] when a delay elapses.
pub type ScheduledFn = Box<dyn FnOnce() + Send + 'static>;

/// Executor seam for delayed callbacks.
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`. Dropping or cancelling the returned
    /// handle prevents the callback from running if it has not started yet.
    fn schedule(&self, delay: Duration, task: ScheduledFn) -> ScheduledTask;
}

/// Exclusive handle to a pending callback.
///
/// The callback is cancelled when the handle is dropped.
pub struct ScheduledTask {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl ScheduledTask {
    fn new(cancelled: Arc<AtomicBool>, abort: Option<AbortHandle>) -> Self {
        Self { cancelled, abort }
    }

    /// Cancel the callback. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

// ============================================================================
// Tokio
// ============================================================================

/// Scheduler backed by `tokio::time::sleep` on a runtime handle.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the runtime the caller is running on, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledFn) -> ScheduledTask {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                task();
            }
        });

        ScheduledTask::new(cancelled, Some(join.abort_handle()))
    }
}

// ============================================================================
// Manual (virtual clock)
// ============================================================================

struct PendingEntry {
    task: ScheduledFn,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), PendingEntry>,
}

/// Deterministic scheduler with a virtual clock.
///
/// Callbacks run synchronously inside [`advance`](Self::advance), in deadline
/// order (ties in scheduling order). Callbacks may schedule further tasks;
/// those run within the same `advance` call when their deadline is reached.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of callbacks that are scheduled and not cancelled.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .queue
            .values()
            .filter(|entry| !entry.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Deadline of the earliest live callback, relative to the virtual epoch.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state
            .lock()
            .queue
            .iter()
            .find(|(_, entry)| !entry.cancelled.load(Ordering::SeqCst))
            .map(|((deadline, _), _)| *deadline)
    }

    /// Move the clock forward by `by`, running every callback that comes due.
    /// Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut ran = 0;

        loop {
            // The lock is released before running the callback so it can
            // schedule or cancel other tasks.
            let entry = {
                let mut state = self.state.lock();
                let due = match state.queue.keys().next() {
                    Some(&(deadline, seq)) if deadline <= target => (deadline, seq),
                    _ => break,
                };
                state.now = due.0;
                state.queue.remove(&due)
            };

            if let Some(entry) = entry {
                if !entry.cancelled.load(Ordering::SeqCst) {
                    (entry.task)();
                    ran += 1;
                }
            }
        }

        self.state.lock().now = target;
        trace!(ran, now_ms = target.as_millis() as u64, "manual scheduler advanced");
        ran
    }

    /// Jump to the next live deadline and run what is due there.
    /// Returns `false` when nothing is pending.
    pub fn fire_next(&self) -> bool {
        let Some(deadline) = self.next_deadline() else {
            return false;
        };
        let now = self.now();
        self.advance(deadline.saturating_sub(now)) > 0
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledFn) -> ScheduledTask {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.state.lock();
        let deadline = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.insert(
            (deadline, seq),
            PendingEntry {
                task,
                cancelled: Arc::clone(&cancelled),
            },
        );
        ScheduledTask::new(cancelled, None)
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_task(counter: &Arc<AtomicUsize>) -> ScheduledFn {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_manual_runs_only_when_due() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _task = scheduler.schedule(Duration::from_secs(2), counter_task(&counter));

        assert_eq!(scheduler.advance(Duration::from_secs(1)), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(scheduler.advance(Duration::from_secs(1)), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.now(), Duration::from_secs(2));
    }

    #[test]
    fn test_manual_cancel_prevents_run() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let task = scheduler.schedule(Duration::from_secs(1), counter_task(&counter));

        task.cancel();
        assert!(task.is_cancelled());
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.advance(Duration::from_secs(5)), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropping_handle_cancels() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        drop(scheduler.schedule(Duration::from_secs(1), counter_task(&counter)));

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_manual_runs_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for (label, secs) in [("late", 3), ("early", 1), ("middle", 2)] {
            let order = Arc::clone(&order);
            handles.push(scheduler.schedule(
                Duration::from_secs(secs),
                Box::new(move || order.lock().push(label)),
            ));
        }

        assert_eq!(scheduler.advance(Duration::from_secs(10)), 3);
        assert_eq!(*order.lock(), vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_callbacks_can_rearm() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<ScheduledTask>>> = Arc::new(Mutex::new(None));

        fn arm(
            scheduler: &ManualScheduler,
            counter: &Arc<AtomicUsize>,
            slot: &Arc<Mutex<Option<ScheduledTask>>>,
        ) {
            let next_scheduler = scheduler.clone();
            let next_counter = Arc::clone(counter);
            let next_slot = Arc::clone(slot);
            let task = scheduler.schedule(
                Duration::from_secs(1),
                Box::new(move || {
                    if next_counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        arm(&next_scheduler, &next_counter, &next_slot);
                    }
                }),
            );
            *slot.lock() = Some(task);
        }

        arm(&scheduler, &counter, &slot);
        assert_eq!(scheduler.advance(Duration::from_secs(10)), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_fire_next() {
        let scheduler = ManualScheduler::new();
        assert!(!scheduler.fire_next());

        let counter = Arc::new(AtomicUsize::new(0));
        let _task = scheduler.schedule(Duration::from_millis(750), counter_task(&counter));
        assert_eq!(scheduler.next_deadline(), Some(Duration::from_millis(750)));

        assert!(scheduler.fire_next());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.now(), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_fires_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let _task = scheduler.schedule(Duration::from_secs(10), counter_task(&counter));

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel() {
        let scheduler = TokioScheduler::current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let task = scheduler.schedule(Duration::from_secs(1), counter_task(&counter));

        task.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tokio_scheduler_requires_runtime() {
        assert!(TokioScheduler::current().is_none());
    }
}
