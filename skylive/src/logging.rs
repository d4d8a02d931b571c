//! Logging setup.
//!
//! Structured logging via `tracing`: optional file output plus stdout,
//! filtered by `RUST_LOG` (default `info`).

use std::fs;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initializes the global subscriber.
///
/// With a log directory, output goes to `<dir>/skylive.log` (without
/// ANSI colors) and to stdout; without one, stdout only.
pub fn init_logging(log_dir: Option<&str>) -> Result<LoggingGuard, io::Error> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(io::stdout);

    let mut file_guard = None;
    let file_layer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, "skylive.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so
    // only the file plumbing is exercised here.
    #[test]
    fn creates_log_directory() {
        let dir = std::env::temp_dir().join(format!(
            "skylive_log_test_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create log dir");
        assert!(dir.exists());
        fs::remove_dir_all(&dir).expect("cleanup");
    }
}
