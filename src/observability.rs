// SPDX-License-Identifier: Apache-2.0

//! Logging and observability helpers.

pub mod redact;

pub use redact::{redact_args, ArgShape};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "tenant-guard.log";
const LOG_RETENTION_DAYS: u64 = 14;

/// Installs a JSON subscriber writing to a daily rolling file.
///
/// `RUST_LOG` overrides the default filter. Safe to call more than once; later
/// calls are no-ops.
pub fn init_tracing(log_dir: Option<PathBuf>) {
    let log_dir = log_dir.unwrap_or_else(log_directory);
    let _ = fs::create_dir_all(&log_dir);

    if let Err(e) = cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tenant_guard=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .json()
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    tracing::info!("Tracing initialized. Logs directory: {:?}", log_dir);
}

/// Per-user data directory holding the config file and logs
pub fn data_directory() -> PathBuf {
    let mut path = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir);
    path.push("tenant-guard");
    path
}

pub fn log_directory() -> PathBuf {
    data_directory().join("logs")
}

fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> std::io::Result<()> {
    let now = SystemTime::now();
    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();

        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(LOG_FILE_PREFIX))
            .unwrap_or(false);
        if !is_log {
            continue;
        }

        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if matches!(age, Some(age) if age > retention) {
            if let Err(e) = fs::remove_file(&path) {
                eprintln!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }
    Ok(())
}
