//! Tracing configuration and log routing.
//!
//! Both binaries log to stdout with a compact formatter and to a file. `ASKDOCS_LOG_FILE` names
//! the file to append to; otherwise logs go to `logs/askdocs.log`. The file writer is
//! non-blocking so request handling never waits on disk.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "askdocs.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber.
///
/// `RUST_LOG` controls filtering (default `default_level`). The stdout layer can be disabled
/// so the CLI keeps stdout for the answer alone; the file layer is added whenever the log file
/// can be opened.
pub fn init_tracing(default_level: &str, stdout: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stdout_layer = stdout.then(|| fmt::layer().with_target(false).compact());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Open the log file as a non-blocking writer.
///
/// Returns `None` when the parent directory cannot be created or the file cannot be opened.
fn configure_file_writer() -> Option<NonBlocking> {
    let path = resolve_log_path(std::env::var_os("ASKDOCS_LOG_FILE"));
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {err}", parent.display());
            return None;
        }
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}

fn resolve_log_path(configured: Option<OsString>) -> PathBuf {
    configured
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_log_file_wins() {
        assert_eq!(
            resolve_log_path(Some("/tmp/askdocs-test.log".into())),
            PathBuf::from("/tmp/askdocs-test.log")
        );
    }

    #[test]
    fn falls_back_to_logs_directory() {
        assert_eq!(resolve_log_path(None), PathBuf::from("logs/askdocs.log"));
        assert_eq!(resolve_log_path(Some(OsString::new())), PathBuf::from("logs/askdocs.log"));
    }
}
