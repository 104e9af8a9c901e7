//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and a
//! JSON log file, so paced batch runs (which can span many minutes of
//! deliberate waiting) leave a complete trace even when the console
//! scrolls past.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Console output is human-readable; file output is JSON under the
/// directory named by `ANALYST_LOG_DIR` (default `log/`). Safe to call
/// more than once; only the first call installs the subscriber.
pub fn init_structured_logging() {
    init_structured_logging_with_level(None);
}

/// Initialize structured logging with an explicit level override.
///
/// `level` takes precedence over the environment-derived default; the CLI
/// uses this to honor `-v`/`-vv`.
pub fn init_structured_logging_with_level(level: Option<&str>) {
    let level = level.map(str::to_string);
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = level.unwrap_or_else(|| get_log_level(&environment));

        let log_dir =
            PathBuf::from(std::env::var("ANALYST_LOG_DIR").unwrap_or_else(|_| "log".to_string()));
        if !log_dir.exists() && fs::create_dir_all(&log_dir).is_err() {
            // Fall back to console-only logging when the directory is
            // unavailable (read-only filesystems in CI).
            let _ = tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(true)
                        .with_filter(EnvFilter::new(log_level.clone())),
                )
                .try_init();
            tracing::warn!(
                log_dir = %log_dir.display(),
                "⚠️ STRUCTURED LOGGING: log directory unavailable, console only"
            );
            return;
        }

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");
        let log_path = log_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&log_dir, log_filename);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_filter(EnvFilter::new(log_level.clone())),
            )
            .with(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(log_level)),
            );

        // try_init so embedding in a host that already set a subscriber
        // (tests, other binaries) is not an error.
        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_path.display(),
            "🔧 STRUCTURED LOGGING: Initialized with file output"
        );

        // The worker thread behind the non-blocking writer lives as long
        // as this guard; the logger is process-lifetime, so leak it.
        std::mem::forget(guard);
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("ANALYST_ENV")
        .or_else(|_| std::env::var("RUST_ENV"))
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}
