//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the stream recovery core:
//! - Logging and tracing infrastructure
//! - Configuration management (`CoreConfig` builder with injected bridges)
//! - Event bus system
//!
//! Higher crates (`core-playback`, `core-service`) depend on this one for
//! their error conventions, the shared event types, and logging setup.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
