//! Process-wide logging setup.
//!
//! File lines look like `14:03:27 - WARNING    - message key=value`. The file
//! layer honours the configured level; the stderr layer honours `RUST_LOG`
//! and defaults to warnings only.

use std::fmt;

use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cgmman_core::ManagerSettings;

use crate::error::{io_err, DaemonError};
use crate::log_rotation::SharedDailyWriter;

/// `<time> - <level> - <message>` event format.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let time = Local::now().format("%H:%M:%S");
        let level = level_name(*event.metadata().level());
        write!(writer, "{time} - {level:<10} - ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        _ => "ERROR",
    }
}

/// Install the daily log file and stderr layers as the global subscriber.
pub fn init_logging(settings: &ManagerSettings) -> Result<SharedDailyWriter, DaemonError> {
    let file_writer = SharedDailyWriter::new(&settings.log_dir, &settings.log_prefix)
        .map_err(|e| io_err(&settings.log_dir, e))?;

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat)
                .with_writer(file_writer.clone())
                .with_ansi(false)
                .with_filter(settings.log_level.to_level_filter()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .map_err(|e| DaemonError::Logging(e.to_string()))?;

    Ok(file_writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lines_carry_time_level_and_message() {
        let dir = TempDir::new().unwrap();
        let writer = SharedDailyWriter::new(dir.path(), "cgmman").unwrap();
        let path = writer.current_path().unwrap();

        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat)
                .with_writer(writer)
                .with_ansi(false),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(file = "a.cgm", "converter failed");
            tracing::info!("scan complete");
        });

        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2, "got: {contents}");

        let (time, rest) = lines[0].split_once(" - ").unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
        assert_eq!(rest, "WARNING    - converter failed file=\"a.cgm\"");
        assert!(lines[1].ends_with(" - INFO       - scan complete"));
    }
}
