//! Logging Infrastructure
//!
//! Structured logging for the engine. Logs go to stderr so the `exec`
//! command can keep stdout for JSON responses.

use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Initialize the logger with optional JSON output and file output
///
/// `RUST_LOG` takes precedence over `log_level`. When `log_dir` exists the
/// logs are written to a daily rolling file there instead of stderr.
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let writer = match log_dir.map(Path::new) {
        Some(dir) if dir.is_dir() => {
            BoxMakeWriter::new(tracing_appender::rolling::daily(dir, "reconcile-engine"))
        }
        _ => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // A global subscriber may already be installed (tests, embedding hosts)
    let installed = if json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    if installed.is_err() {
        tracing::debug!("Global logger already initialized");
    }
}
