//! Time and Logging Abstractions
//!
//! Provides the rational media clock used by host players, an injectable wall
//! clock for testing, and the logging sink used to forward structured logs to
//! the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Timescale used when converting seconds or `Duration`s into [`MediaTime`]
/// without an explicit scale. 600 divides evenly into the common video and
/// audio frame rates.
pub const DEFAULT_TIMESCALE: i32 = 600;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Classification of a [`MediaTime`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaTimeKind {
    /// A finite, numeric time.
    Valid,
    /// The host could not provide a time (e.g. no item loaded).
    Invalid,
    PositiveInfinity,
    NegativeInfinity,
    /// Time is unknown, as for live streams without a duration.
    Indefinite,
}

/// Rational media time as reported by host players: `value / timescale`
/// seconds.
///
/// # Example
///
/// ```
/// use bridge_traits::time::MediaTime;
/// use std::time::Duration;
///
/// let t = MediaTime::new(900, 600);
/// assert_eq!(t.seconds(), Some(1.5));
/// assert_eq!(t.to_duration(), Some(Duration::from_millis(1500)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
    pub kind: MediaTimeKind,
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime {
        value: 0,
        timescale: 1,
        kind: MediaTimeKind::Valid,
    };

    pub const INVALID: MediaTime = MediaTime::special(MediaTimeKind::Invalid);
    pub const INDEFINITE: MediaTime = MediaTime::special(MediaTimeKind::Indefinite);
    pub const POSITIVE_INFINITY: MediaTime = MediaTime::special(MediaTimeKind::PositiveInfinity);
    pub const NEGATIVE_INFINITY: MediaTime = MediaTime::special(MediaTimeKind::NegativeInfinity);

    const fn special(kind: MediaTimeKind) -> Self {
        Self {
            value: 0,
            timescale: 0,
            kind,
        }
    }

    /// Create a numeric time. A non-positive timescale yields [`MediaTime::INVALID`].
    pub fn new(value: i64, timescale: i32) -> Self {
        if timescale <= 0 {
            return Self::INVALID;
        }
        Self {
            value,
            timescale,
            kind: MediaTimeKind::Valid,
        }
    }

    /// Convert floating-point seconds, rounding to the nearest tick.
    ///
    /// NaN maps to [`MediaTime::INVALID`]; infinities and values that do not
    /// fit in the tick range map to the matching infinity.
    pub fn from_seconds(seconds: f64, timescale: i32) -> Self {
        if timescale <= 0 || seconds.is_nan() {
            return Self::INVALID;
        }

        let ticks = (seconds * f64::from(timescale)).round();
        if ticks >= i64::MAX as f64 {
            Self::POSITIVE_INFINITY
        } else if ticks <= i64::MIN as f64 {
            Self::NEGATIVE_INFINITY
        } else {
            Self::new(ticks as i64, timescale)
        }
    }

    pub fn from_duration(duration: Duration, timescale: i32) -> Self {
        if timescale <= 0 {
            return Self::INVALID;
        }

        let ticks = duration.as_nanos() * timescale as u128;
        let rounded = (ticks + NANOS_PER_SEC / 2) / NANOS_PER_SEC;
        match i64::try_from(rounded) {
            Ok(value) => Self::new(value, timescale),
            Err(_) => Self::POSITIVE_INFINITY,
        }
    }

    /// `true` for finite times that can be converted to seconds.
    pub fn is_numeric(&self) -> bool {
        self.kind == MediaTimeKind::Valid
    }

    pub fn is_valid(&self) -> bool {
        self.kind != MediaTimeKind::Invalid
    }

    pub fn seconds(&self) -> Option<f64> {
        if !self.is_numeric() {
            return None;
        }
        Some(self.value as f64 / f64::from(self.timescale))
    }

    /// Exact conversion to a `Duration`. Negative or non-numeric times have no
    /// `Duration` representation.
    pub fn to_duration(&self) -> Option<Duration> {
        if !self.is_numeric() || self.value < 0 {
            return None;
        }

        let value = self.value as u128;
        let timescale = self.timescale as u128;
        let secs = (value / timescale) as u64;
        let nanos = ((value % timescale) * NANOS_PER_SEC / timescale) as u32;
        Some(Duration::new(secs, nanos))
    }

    /// Re-express this time in another timescale, rounding half away from zero.
    ///
    /// Non-numeric times are returned unchanged.
    pub fn convert_scale(&self, timescale: i32) -> Self {
        if !self.is_numeric() {
            return *self;
        }
        if timescale <= 0 {
            return Self::INVALID;
        }
        if timescale == self.timescale {
            return *self;
        }

        let scaled = self.value as i128 * timescale as i128;
        let from = self.timescale as i128;
        let half = from / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / from
        } else {
            (scaled - half) / from
        };

        match i64::try_from(rounded) {
            Ok(value) => Self::new(value, timescale),
            Err(_) if rounded > 0 => Self::POSITIVE_INFINITY,
            Err(_) => Self::NEGATIVE_INFINITY,
        }
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Duration> for MediaTime {
    fn from(duration: Duration) -> Self {
        Self::from_duration(duration, DEFAULT_TIMESCALE)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MediaTimeKind::Valid => write!(f, "{}/{}", self.value, self.timescale),
            MediaTimeKind::Invalid => f.write_str("invalid"),
            MediaTimeKind::PositiveInfinity => f.write_str("+inf"),
            MediaTimeKind::NegativeInfinity => f.write_str("-inf"),
            MediaTimeKind::Indefinite => f.write_str("indefinite"),
        }
    }
}

/// Format a playback position for display: `m:ss` below one hour, `h:mm:ss`
/// above.
pub fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Time source trait
///
/// Abstracts wall-clock time so outage durations can be measured
/// deterministically in tests.
pub trait Clock: Send + Sync {
    /// Get current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Get current Unix timestamp in milliseconds
    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System clock implementation using actual system time
#[derive(Debug, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Target module/component
    pub target: String,
    pub message: String,
    /// Structured fields
    pub fields: HashMap<String, String>,
    /// Name of the span the event was recorded in
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }
}

/// Logger sink trait
///
/// Forwards structured logs from the core to host logging pipelines
/// (OSLog on Apple platforms, Logcat on Android, console on desktop).
///
/// Implementations must not log media URLs with embedded credentials; the
/// core strips query strings before logging but hosts may add their own
/// fields.
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    /// Forward a log entry to the host logging system
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Flush any buffered logs
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Logs below this level are dropped before reaching the sink.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Console logger implementation for testing/development
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[async_trait::async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            println!(
                "[{}] {} {}: {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                entry.level.as_filter_str().to_uppercase(),
                entry.target,
                entry.message
            );

            if !entry.fields.is_empty() {
                println!("  Fields: {:?}", entry.fields);
            }
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_time_seconds() {
        assert_eq!(MediaTime::new(900, 600).seconds(), Some(1.5));
        assert_eq!(MediaTime::ZERO.seconds(), Some(0.0));
        assert_eq!(MediaTime::INVALID.seconds(), None);
        assert_eq!(MediaTime::INDEFINITE.seconds(), None);
    }

    #[test]
    fn test_media_time_rejects_bad_timescale() {
        assert_eq!(MediaTime::new(10, 0), MediaTime::INVALID);
        assert_eq!(MediaTime::new(10, -5), MediaTime::INVALID);
        assert_eq!(MediaTime::from_seconds(1.0, 0), MediaTime::INVALID);
    }

    #[test]
    fn test_from_seconds_rounds_to_nearest_tick() {
        let t = MediaTime::from_seconds(1.0 / 3.0, 600);
        assert_eq!(t.value, 200);
        assert_eq!(t.timescale, 600);

        let t = MediaTime::from_seconds(0.0009, 600);
        assert_eq!(t.value, 1);
    }

    #[test]
    fn test_from_seconds_special_values() {
        assert_eq!(MediaTime::from_seconds(f64::NAN, 600), MediaTime::INVALID);
        assert_eq!(
            MediaTime::from_seconds(f64::INFINITY, 600),
            MediaTime::POSITIVE_INFINITY
        );
        assert_eq!(
            MediaTime::from_seconds(f64::NEG_INFINITY, 600),
            MediaTime::NEGATIVE_INFINITY
        );
    }

    #[test]
    fn test_to_duration_is_exact() {
        let t = MediaTime::new(1, 3);
        assert_eq!(t.to_duration(), Some(Duration::new(0, 333_333_333)));

        let t = MediaTime::new(7_500, 600);
        assert_eq!(t.to_duration(), Some(Duration::from_millis(12_500)));
    }

    #[test]
    fn test_to_duration_rejects_negative_and_special() {
        assert_eq!(MediaTime::new(-600, 600).to_duration(), None);
        assert_eq!(MediaTime::POSITIVE_INFINITY.to_duration(), None);
        assert_eq!(MediaTime::INVALID.to_duration(), None);
    }

    #[test]
    fn test_from_duration() {
        let t = MediaTime::from_duration(Duration::from_millis(2_250), 600);
        assert_eq!(t, MediaTime::new(1_350, 600));

        let t: MediaTime = Duration::from_secs(3).into();
        assert_eq!(t, MediaTime::new(1_800, DEFAULT_TIMESCALE));
    }

    #[test]
    fn test_convert_scale() {
        let t = MediaTime::new(1_350, 600).convert_scale(1_000);
        assert_eq!(t, MediaTime::new(2_250, 1_000));

        let t = MediaTime::new(-1, 600).convert_scale(1);
        assert_eq!(t, MediaTime::new(0, 1));

        assert_eq!(
            MediaTime::INDEFINITE.convert_scale(600),
            MediaTime::INDEFINITE
        );
        assert_eq!(MediaTime::new(1, 600).convert_scale(0), MediaTime::INVALID);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_secs(0)), "0:00");
        assert_eq!(format_clock(Duration::from_secs(65)), "1:05");
        assert_eq!(format_clock(Duration::from_millis(59_999)), "0:59");
        assert_eq!(format_clock(Duration::from_secs(3_600)), "1:00:00");
        assert_eq!(format_clock(Duration::from_secs(3_725)), "1:02:05");
    }

    #[test]
    fn test_media_time_display() {
        assert_eq!(MediaTime::new(3, 600).to_string(), "3/600");
        assert_eq!(MediaTime::INVALID.to_string(), "invalid");
        assert_eq!(MediaTime::INDEFINITE.to_string(), "indefinite");
    }

    #[test]
    fn test_system_clock() {
        let clock = SystemClock;
        assert!(clock.unix_timestamp_millis() > 0);
    }

    #[test]
    fn test_log_entry_builder() {
        let entry = LogEntry::new(LogLevel::Info, "test", "Test message")
            .with_field("attempt", "3")
            .with_span_id("retry");

        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.target, "test");
        assert_eq!(entry.message, "Test message");
        assert_eq!(entry.fields.get("attempt"), Some(&"3".to_string()));
        assert_eq!(entry.span_id, Some("retry".to_string()));
    }

    #[tokio::test]
    async fn test_console_logger() {
        let logger = ConsoleLogger::default();
        let entry = LogEntry::new(LogLevel::Info, "test", "Test log");

        logger.log(entry).await.unwrap();
    }
}
