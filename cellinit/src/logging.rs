//! Tracing subscriber setup for the `cellinit` binary.

use std::path::Path;

use cellinit_shared::errors::{CellinitError, CellinitResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_FILE_PREFIX: &str = "cellinit.log";

/// Install the global subscriber.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. Logs always go to
/// stderr; when `log_dir` is given they are also written to a daily rolling
/// file there. Keep the returned guard alive until exit so buffered file
/// output is flushed.
pub fn init_logging(log_dir: Option<&Path>) -> CellinitResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                CellinitError::Config(format!(
                    "Failed to create log directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .map_err(|e| CellinitError::Internal(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}
