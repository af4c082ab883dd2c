use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the logging system with the specified log level.
///
/// Engine and capability logs carry structured fields (`task_id`,
/// `subgraph`, `retry_count`, `correlation_id`), so the stdout layer keeps
/// targets visible. When `log_dir` is given, a second layer writes to a
/// daily rotating `taskgraph.log` in that directory.
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_logging(log_level: &str, log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', defaulting to 'info'", log_level);
            EnvFilter::new("info")
        });

    let stdout_layer = fmt::layer().with_target(true).with_line_number(true);

    match log_dir {
        Some(dir) => {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "taskgraph.log");
            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_line_number(true)
                .with_writer(file_appender);

            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .try_init();
        }
    }
}
