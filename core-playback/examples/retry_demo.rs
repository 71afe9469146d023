//! Retry producer on a real Tokio timer.
//!
//! Run with: `cargo run --example retry_demo --package core-playback`

use core_async::scheduler::TokioScheduler;
use core_playback::{ProducerId, RetryEvent, RetryEventListener, RetryEventProducer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Forwards events to the async side; listeners must not block.
struct ChannelListener(mpsc::UnboundedSender<(ProducerId, RetryEvent)>);

impl RetryEventListener for ChannelListener {
    fn on_retry_event(&self, source: ProducerId, event: RetryEvent) {
        let _ = self.0.send((source, event));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("core_playback=debug").init();

    let scheduler = TokioScheduler::current().ok_or("no Tokio runtime")?;
    let producer = RetryEventProducer::new(Arc::new(scheduler));
    producer.set_maximum_retry_count(4);
    producer.set_retry_timeout(Duration::from_millis(500));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = Arc::new(ChannelListener(tx));
    producer.set_listener(&listener);
    producer.start_producing_events();

    while let Some((source, event)) = rx.recv().await {
        println!("{} -> {:?}", source, event);
        if event.is_terminal() {
            break;
        }
    }

    Ok(())
}
