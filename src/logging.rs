use crate::error::{MetadataError, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging plus a daily JSON log file under `log_dir`.
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// until the process is done logging.
pub fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir).map_err(|e| MetadataError::io(log_dir, e))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("chorale_meta.log")
        .build(log_dir)
        .map_err(|e| MetadataError::Logging(e.to_string()))?;
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    // JSON to the file, plain text to the console
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    // Respect RUST_LOG if set; otherwise stage messages only
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chorale_meta=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| MetadataError::Logging(e.to_string()))?;

    Ok(guard)
}
