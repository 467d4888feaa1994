// Logging module - tracing subscriber setup
//
// Logs go to stderr so they never mix with command output on stdout.
// File logging is opt-in and writes JSON lines through a non-blocking
// rotating appender.
//
// Precedence: RUST_LOG env var > --verbose > settings file > default "warn"

use crate::config::{LogFile, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter directive used when RUST_LOG is not set
fn default_directive(config: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("ccs={},reqwest=warn", level)
}

/// Log files are named `ccs.<date>.log`
const LOG_FILE_PREFIX: &str = "ccs";

/// Rolling appender; creates the directory if needed
fn open_log_file(file: &LogFile) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(file.rotation.into())
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&file.dir)
}

/// Install the global subscriber.
///
/// The returned guard must be kept alive for the duration of the program
/// so buffered file logs are flushed on exit.
pub fn init(config: &LoggingConfig, verbose: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config, verbose)));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, guard) = match config.file.as_ref().map(open_log_file) {
        Some(Ok(appender)) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            // Fall back to stderr-only logging
            eprintln!("Warning: Could not open log file: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}
