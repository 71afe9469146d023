//! Integration tests for the logging system.
//!
//! The global subscriber can only be installed once per process, so every
//! assertion that needs `init_logging` lives in a single test.

use bridge_traits::time::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, redact_url, strip_path, LogFormat, LoggingConfig,
};
use core_runtime::Error;

#[test]
fn test_init_logging_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    init_logging(config.clone()).expect("first init succeeds");
    tracing::debug!(target: "core_playback", attempt = 1u32, "retry available");

    assert!(matches!(init_logging(config), Err(Error::Config(_))));
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true)
        .with_filter("core_service=trace");

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
    assert_eq!(config.filter.as_deref(), Some("core_service=trace"));
}

#[test]
fn test_default_format_follows_build_profile() {
    let config = LoggingConfig::default();

    #[cfg(debug_assertions)]
    assert_eq!(config.format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(config.format, LogFormat::Json);

    assert!(config.redact_pii);
    assert!(config.logger_sink.is_none());
}

#[test]
fn test_redaction_of_credentials() {
    assert_eq!(redact_if_sensitive("access_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("session_cookie", "c=1"), "[REDACTED]");

    let email = redact_if_sensitive("owner", "listener@example.com");
    assert!(email.starts_with('l'));
    assert!(!email.contains("example.com"));

    assert_eq!(redact_if_sensitive("quality", "high"), "high");
    assert_eq!(redact_if_sensitive("attempt", "3"), "3");
}

#[test]
fn test_redaction_of_stream_urls() {
    assert_eq!(
        redact_url("https://cdn.example.com/track/42/high.aac?Expires=1&Signature=s"),
        "https://cdn.example.com/track/42/high.aac?[REDACTED]"
    );
    assert_eq!(
        redact_if_sensitive("source", "http://u:p@radio.example.com/live"),
        "http://radio.example.com/live"
    );
    assert_eq!(
        redact_url("https://cdn.example.com/plain.mp3"),
        "https://cdn.example.com/plain.mp3"
    );
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/var/mobile/Containers/cache/low.m4a"), "low.m4a");
    assert_eq!(strip_path("C:\\Music\\cache\\high.flac"), "high.flac");
    assert_eq!(strip_path("bare.mp3"), "bare.mp3");
    assert_eq!(strip_path("/var/cache/"), "");
    assert_eq!(strip_path(""), "");
}
