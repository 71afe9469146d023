//! Logging setup walkthrough.
//!
//! ```bash
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_playback=trace"
//! ```

use bridge_traits::time::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, redact_url, strip_path, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_logger_sink(Arc::new(ConsoleLogger::default()));
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config)?;
    info!(format = ?format, "logging initialized");

    let span = info_span!("recovery", producer_id = "demo");
    let _entered = span.enter();

    let url = "https://cdn.example.com/track/7/high.aac?Signature=abcdef";
    warn!(url = %redact_url(url), reason = "stalled", "playback interrupted");

    for attempt in 1..=3u32 {
        debug!(attempt, max_attempts = 3u32, "retry available");
    }

    info!(file = %strip_path("/tmp/cache/normal.aac"), "reloaded from cache");
    Ok(())
}
