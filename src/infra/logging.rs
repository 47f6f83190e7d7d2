use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Filter directive: `RUST_LOG`, else `LOG_LEVEL`, else `info`.
fn filter_directive() -> String {
    std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

pub fn init() {
    // Initialize tracing subscriber once. stdout carries the MCP stdio
    // stream, so logs go to stderr or, with LOG_FILE set, to that file.
    let env_filter = EnvFilter::try_new(filter_directive()).unwrap_or_else(|_| EnvFilter::new("info"));
    let (log_file, unusable) = match open_log_file() {
        Ok(file) => (file, None),
        Err(reason) => (None, Some(reason)),
    };

    let _ = match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    if let Some(reason) = unusable {
        tracing::warn!("{reason}; logging to stderr instead");
    }
}

/// The `LOG_FILE` target opened for append, `None` when unset.
fn open_log_file() -> Result<Option<File>, String> {
    let Some(path) = std::env::var("LOG_FILE").ok().filter(|p| !p.trim().is_empty()) else {
        return Ok(None);
    };
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map(Some)
        .map_err(|e| format!("cannot open LOG_FILE {path}: {e}"))
}

/// Emit a metric both as a log line and through the `metrics` facade.
pub fn log_metric(tool: &str, metric: &str, value: f64) {
    tracing::info!(tool = tool, metric = metric, value = value, "metric");
    metrics::histogram!(metric.to_string(), "tool" => tool.to_string()).record(value);
}
