//! Logging setup for the binary.
//!
//! Console output always. With a log file (server mode) every line is also
//! appended to that file through a non-blocking writer whose guard must live
//! as long as the process.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::{ReceiptError, Result};

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `level` when set.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_lowercase()))
        .map_err(|e| ReceiptError::Config(format!("Invalid log level '{}': {}", level, e)))?;

    let console = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_appender(path)?);
            let layer = fmt::layer().with_ansi(false).with_target(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| ReceiptError::Config(format!("Logger already set: {}", e)))?;

    if let Some(path) = log_file {
        tracing::info!("Logging to file: {}", path.display());
    }

    Ok(guard)
}

fn open_appender(path: &Path) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| ReceiptError::Config(format!("Invalid log file '{}'", path.display())))?;
    std::fs::create_dir_all(dir)?;

    Ok(tracing_appender::rolling::never(dir, file_name))
}
