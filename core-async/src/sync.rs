//! Synchronization primitives.
//!
//! Async-aware channels and locks come from `tokio::sync`; cancellation
//! tokens from `tokio_util`. Short, non-async critical sections (timer state,
//! listener registration) use `parking_lot` locks instead, which never hold
//! across an `.await`.

pub use parking_lot::{Mutex as BlockingMutex, MutexGuard as BlockingMutexGuard};
pub use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock};
pub use tokio_util::sync::CancellationToken;
