//! Integration tests for core-async on the Tokio runtime.

use core_async::scheduler::{ManualScheduler, Scheduler, TokioScheduler};
use core_async::{runtime, sync, task, time};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[tokio::test]
async fn test_timeout_success() {
    let result = time::timeout(time::Duration::from_millis(100), async {
        time::sleep(time::Duration::from_millis(10)).await;
        42
    })
    .await;

    assert_eq!(result.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_mpsc_channel() {
    let (tx, mut rx) = sync::mpsc::unbounded_channel();

    task::spawn(async move {
        for i in 0..5 {
            tx.send(i).unwrap();
        }
    });

    let mut sum = 0;
    while let Some(value) = rx.recv().await {
        sum += value;
    }

    assert_eq!(sum, 10);
}

#[tokio::test]
async fn test_cancellation_token() {
    let token = sync::CancellationToken::new();
    let child = token.child_token();

    let handle = task::spawn(async move {
        child.cancelled().await;
        "cancelled"
    });

    token.cancel();
    assert_eq!(handle.await.unwrap(), "cancelled");
}

#[test]
fn test_block_on() {
    let value = runtime::block_on(async { 7 * 6 }).unwrap();
    assert_eq!(value, 42);
}

#[tokio::test(start_paused = true)]
async fn test_tokio_scheduler_rearm_chain() {
    let scheduler = Arc::new(TokioScheduler::current().unwrap());
    let counter = Arc::new(AtomicUsize::new(0));
    let slot = Arc::new(sync::BlockingMutex::new(None));

    fn arm(
        scheduler: Arc<TokioScheduler>,
        counter: Arc<AtomicUsize>,
        slot: Arc<sync::BlockingMutex<Option<core_async::ScheduledTask>>>,
    ) {
        let next = (Arc::clone(&scheduler), Arc::clone(&counter), Arc::clone(&slot));
        let task = scheduler.schedule(
            time::Duration::from_secs(1),
            Box::new(move || {
                if next.1.fetch_add(1, Ordering::SeqCst) < 4 {
                    arm(next.0, next.1, next.2);
                }
            }),
        );
        // The previous handle belongs to the callback that is running now.
        *slot.lock() = Some(task);
    }

    arm(Arc::clone(&scheduler), Arc::clone(&counter), Arc::clone(&slot));

    time::sleep(time::Duration::from_millis(3_500)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    time::sleep(time::Duration::from_secs(10)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 5);
}

#[test]
fn test_manual_scheduler_shared_between_clones() {
    let scheduler = ManualScheduler::new();
    let other = scheduler.clone();
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = Arc::clone(&counter);

    let _task = other.schedule(
        time::Duration::from_secs(1),
        Box::new(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }),
    );

    assert_eq!(scheduler.pending(), 1);
    scheduler.advance(time::Duration::from_secs(1));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}
