//! Time-related re-exports.
//!
//! `Instant` is monotonic; `sleep` integrates with Tokio's timer wheel, which
//! means tests can drive it with `tokio::time::pause`/`advance`.

pub use std::time::{Duration, Instant};
pub use tokio::time::{sleep, timeout, Sleep};
