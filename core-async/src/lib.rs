//! Runtime abstraction layer for the stream recovery core.
//!
//! All core-* crates go through this crate instead of naming Tokio directly,
//! so the executor and the timer source can be swapped in one place.
//!
//! # Modules
//!
//! - `task`: Task spawning
//! - `time`: Sleep, timeouts and instants
//! - `sync`: Channels, locks and cancellation tokens
//! - `runtime`: Runtime handles and `block_on`
//! - `scheduler`: Cancellable one-shot delayed callbacks (the retry timer)
//!
//! # Examples
//!
//! ```rust
//! use core_async::scheduler::{ManualScheduler, Scheduler};
//! use core_async::time::Duration;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! let scheduler = ManualScheduler::new();
//! let fired = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&fired);
//!
//! let _task = scheduler.schedule(Duration::from_secs(1), Box::new(move || {
//!     flag.store(true, Ordering::SeqCst);
//! }));
//!
//! scheduler.advance(Duration::from_secs(1));
//! assert!(fired.load(Ordering::SeqCst));
//! ```

pub mod runtime;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod time;

pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, TokioScheduler};
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
pub use tokio::select;
