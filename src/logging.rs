//! Logging configuration.
//!
//! Two sinks are installed:
//! - the append-only event log, one `[DD.MM.YYYY--HH:MM:SS] <message>` line
//!   per event with timestamps in the site's fixed UTC offset;
//! - a diagnostic sink, systemd-journald on Linux when reachable, stderr
//!   otherwise.
//!
//! Log level can be controlled via the `DAYLAPSE_LOG` environment variable:
//! - `DAYLAPSE_LOG=debug` for verbose output
//! - `DAYLAPSE_LOG=info` for standard output (default)
//! - `DAYLAPSE_LOG=warn` for warnings and errors only

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::Writer, time::FormatTime, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Timestamp layout used in the event log and in logged wakeup times.
pub const STAMP_FORMAT: &str = "%d.%m.%Y--%H:%M:%S";

pub fn format_stamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(STAMP_FORMAT).to_string()
}

/// Renders `[DD.MM.YYYY--HH:MM:SS]` in a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct EventTimer {
    offset: FixedOffset,
}

impl EventTimer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl FormatTime for EventTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", format_stamp(Utc::now(), self.offset))
    }
}

fn event_layer<S, W>(writer: W, offset: FixedOffset) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(EventTimer::new(offset))
        .with_level(false)
        .with_target(false)
        .with_filter(LevelFilter::INFO)
}

/// Initialize the logging system. Call once at startup.
///
/// The returned guard flushes the event log when dropped; hold it until the
/// process exits.
pub fn init(event_log: &Path, offset: FixedOffset) -> Result<WorkerGuard> {
    let log_dir = event_log
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = event_log
        .file_name()
        .context("Event log path has no file name")?;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // DAYLAPSE_LOG only tunes the diagnostic sink; the event log stays at INFO
    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(journald_layer.with_filter(diagnostic_filter()))
                .with(event_layer(non_blocking, offset))
                .try_init()
                .context("Failed to set tracing subscriber")?;

            tracing::debug!("Logging initialized with journald backend");
            return Ok(guard);
        }
    }

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_filter(diagnostic_filter()),
        )
        .with(event_layer(non_blocking, offset))
        .try_init()
        .context("Failed to set tracing subscriber")?;

    tracing::debug!("Logging initialized with stderr backend");
    Ok(guard)
}

fn diagnostic_filter() -> EnvFilter {
    EnvFilter::try_from_env("DAYLAPSE_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stamp_uses_fixed_offset() {
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 22, 5, 9).unwrap();
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(format_stamp(at, offset), "22.06.2024--01:05:09");
    }

    #[test]
    fn test_event_line_format() {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let subscriber =
            tracing_subscriber::registry().with(event_layer(move || writer.clone(), offset));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Process started");
            tracing::debug!("not for the event log");
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);

        let line = lines[0];
        assert!(line.starts_with('['));
        assert_eq!(&line[21..], "] Process started");
        assert_eq!(&line[11..13], "--");
    }

    #[test]
    fn test_event_log_ignores_diagnostic_level() {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let offset = FixedOffset::east_opt(0).unwrap();
        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::sink)
                    .with_filter(EnvFilter::new("warn")),
            )
            .with(event_layer(move || writer.clone(), offset));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Captured frame 1/5 frames today and 1/10 frames total.");
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Captured frame 1/5"));
    }

    #[test]
    fn test_dropping_guard_flushes_event_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("log.txt");

        let guard = init(&path, FixedOffset::east_opt(0).unwrap()).unwrap();
        for i in 0..2000 {
            tracing::info!("filler {}", i);
        }
        tracing::error!("Capture failed. Exiting...");
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().last().unwrap().ends_with("] Capture failed. Exiting..."));
    }
}
