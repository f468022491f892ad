//! Integration tests for logging system

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, source_label, LogFormat, LoggingConfig};

#[derive(Default)]
struct CapturingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CapturingSink {
    async fn log(&self, entry: LogEntry) -> BridgeResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// Only one global subscriber per process: everything that needs it lives here.
#[test]
fn test_sink_receives_structured_fields() {
    let sink = Arc::new(CapturingSink::default());
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_filter("logging_integration=debug")
            .with_logger_sink(sink.clone()),
    )
    .expect("first initialization succeeds");

    tracing::debug!(request_id = 7u64, kind = "audio", "Retrying media instance");
    tracing::trace!("below the sink level");

    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.level, LogLevel::Debug);
    assert_eq!(entry.message, "Retrying media instance");
    assert_eq!(entry.fields.get("request_id").map(String::as_str), Some("7"));
    assert_eq!(entry.fields.get("kind").map(String::as_str), Some("audio"));
    drop(entries);

    // A second subscriber is refused rather than silently replacing the first.
    assert!(init_logging(LoggingConfig::default()).is_err());
}

#[test]
fn test_invalid_filter_is_rejected() {
    let config = LoggingConfig::default().with_filter("core_playback=verbose");
    assert!(init_logging(config).is_err());
}

#[test]
fn test_source_labels() {
    assert_eq!(source_label("assets/lizard.m4a"), "lizard.m4a");
    assert_eq!(source_label("https://cdn.example/fx/pop.gif?t=123"), "pop.gif");
    assert_eq!(source_label("C:\\media\\tap.wav"), "tap.wav");
    assert_eq!(source_label("data:audio/wav;base64,UklGRnoGAABXQVZF"), "data-uri");
    assert_eq!(source_label("plain"), "plain");
}
