use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Logs JSON to `log_path` so the interactive UI keeps the terminal to
/// itself. The returned guard flushes the writer when dropped.
pub fn init_file(log_path: &Path, verbose: bool) -> Option<WorkerGuard> {
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory: {e}");
        return None;
    }

    let file = match fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to open log file: {e}");
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(if verbose { "debug" } else { "info" }))
        .with(
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
        return None;
    }

    LOG_PATH.set(log_path.to_path_buf()).ok();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Logging initialized");

    Some(guard)
}

/// Human-readable logs on stderr for the one-shot commands, whose stdout
/// carries the answer.
pub fn init_stderr(verbose: bool) {
    let subscriber = tracing_subscriber::registry()
        .with(env_filter(if verbose { "debug" } else { "warn" }))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}

pub fn log_file_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
