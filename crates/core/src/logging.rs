//! Unified logging integration
//!
//! Installs a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`.
//! Safe to call more than once; only the first call installs anything.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize logging with the `info` default filter
pub fn init_logging() {
    init_logging_with_level(LogLevel::Info);
}

/// Initialize logging, using `default_level` when `RUST_LOG` is unset
pub fn init_logging_with_level(default_level: LogLevel) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter()));

        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .try_init();

        match installed {
            Ok(()) => tracing::info!("📝 Initialized tracing logging"),
            // Another subscriber (e.g. a test harness) already owns the global slot.
            Err(e) => eprintln!("tracing subscriber not installed: {e}"),
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[macro_export]
macro_rules! log_latency {
    ($operation:expr, $duration_micros:expr) => {
        if $duration_micros < 1000 {
            tracing::debug!("⚡ {} completed in {}μs", $operation, $duration_micros);
        } else {
            tracing::info!("⚡ {} completed in {:.3}ms", $operation, $duration_micros as f64 / 1000.0);
        }
    };
}

#[macro_export]
macro_rules! log_order {
    ($action:expr, $symbol:expr, $detail:expr) => {
        tracing::info!("📋 ORDER {}: {} ({})", $action, $symbol, $detail);
    };
}

#[macro_export]
macro_rules! log_rate_limit {
    ($request_usage:expr, $order_usage:expr) => {
        tracing::debug!(
            request_usage = $request_usage,
            order_usage = $order_usage,
            "🚦 rate limit usage updated"
        );
    };
}

#[macro_export]
macro_rules! log_error {
    ($operation:expr, $error:expr) => {
        tracing::error!("❌ {} failed: {}", $operation, $error);
    };
}
