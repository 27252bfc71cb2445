//! Logging initialization and configuration.
//!
//! Every log line goes to two places:
//! - **stdout**: compact, human-readable, ANSI colors when attached to a terminal
//! - **log file**: the same compact format without colors, appended across restarts
//!
//! The filter comes from `RUST_LOG`, then `BLUEBLUE_LOG_LEVEL`, then the configured level.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use blueblue_core::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Static guards to keep non-blocking writers alive.
/// These must persist for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static STDOUT_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize logging to stdout and the configured log file.
///
/// # Errors
///
/// Returns an error if the env filter cannot be parsed or the log file's directory
/// cannot be created.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let log_level =
        std::env::var("BLUEBLUE_LOG_LEVEL").unwrap_or_else(|_| config.level.clone());

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let (log_dir, file_name) = split_log_path(&config.file);
    if !log_dir.as_os_str().is_empty() && !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)?;
    }

    // Never rotates; the appender opens the file in append mode.
    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let file_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_stdout)
        .with_target(true)
        .with_ansi(std::io::stdout().is_terminal());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    // Store guards to prevent dropping (keeps writers alive)
    let _ = FILE_GUARD.set(file_guard);
    let _ = STDOUT_GUARD.set(stdout_guard);

    Ok(())
}

/// Split a log file path into the directory to create it in and its file name.
fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = path
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);
    let file = path
        .file_name()
        .map_or_else(|| PathBuf::from("blueblue.log"), PathBuf::from);
    (dir, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_bare_file_name() {
        let (dir, file) = split_log_path(Path::new("blueblue.log"));
        assert!(dir.as_os_str().is_empty());
        assert_eq!(file, PathBuf::from("blueblue.log"));
    }

    #[test]
    fn test_split_nested_path() {
        let (dir, file) = split_log_path(Path::new("/var/log/blueblue/scan.log"));
        assert_eq!(dir, PathBuf::from("/var/log/blueblue"));
        assert_eq!(file, PathBuf::from("scan.log"));
    }

    #[test]
    fn test_split_directory_only_falls_back_to_default_name() {
        let (_, file) = split_log_path(Path::new("/"));
        assert_eq!(file, PathBuf::from("blueblue.log"));
    }
}
