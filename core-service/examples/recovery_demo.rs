//! Simulated outage: the host player stalls, the service retries on a real
//! Tokio timer while stepping quality down, and the host recovers.
//!
//! Run with: `cargo run --example recovery_demo --package core-service`

use anyhow::Context;
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::PlayerItem;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{
    AudioQuality, AudioSource, CoreConfig, CoreEvent, MediaPlayer, MediaTime, PlaybackConfig,
    PlaybackEvent, RecoveryService,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

struct PrintingPlayer;

#[async_trait]
impl MediaPlayer for PrintingPlayer {
    async fn current_time(&self) -> BridgeResult<MediaTime> {
        Ok(MediaTime::from_seconds(83.4, 600))
    }

    async fn seek(&self, to: MediaTime) -> BridgeResult<()> {
        println!("  host: seek to {}", to);
        Ok(())
    }

    async fn replace_current_item(&self, item: PlayerItem) -> BridgeResult<()> {
        println!(
            "  host: attach {} ({})",
            item.source.log_label(),
            item.quality_label.unwrap_or_default()
        );
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        println!("  host: play");
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn is_playing(&self) -> BridgeResult<bool> {
        Ok(true)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))
        .context("logging setup")?;

    let config = CoreConfig::builder()
        .media_player(Arc::new(PrintingPlayer))
        .build()?;

    let playback = PlaybackConfig::from_json_str(
        r#"{ "retry": { "maximum_retry_count": 4, "retry_timeout": 0.5 } }"#,
    )?;

    let variants: BTreeMap<_, _> = AudioQuality::ALL
        .into_iter()
        .map(|q| (q, AudioSource::remote(format!("https://cdn.example.com/demo/{}.aac", q))))
        .collect();

    let service = RecoveryService::new(config, playback, variants)?;
    let mut events = service.subscribe();
    service.load_initial().await?;

    service.handle_interruption("simulated network stall");

    let mut retries = 0;
    while let Ok(event) = events.recv().await {
        println!("event: {} {:?}", event.description(), event);
        if let CoreEvent::Playback(PlaybackEvent::Error { recoverable: false, .. }) = event {
            break;
        }
        if matches!(event, CoreEvent::Recovery(_)) {
            retries += 1;
            if retries == 3 {
                tokio::time::sleep(Duration::from_millis(100)).await;
                service.handle_recovered();
                break;
            }
        }
    }

    service.shutdown().await;
    Ok(())
}
