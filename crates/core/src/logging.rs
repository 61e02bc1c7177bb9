//! Logging infrastructure for Rulegate.
//!
//! This module initializes the tracing subscriber for structured logging.
//! Logs go to stderr, either as human-readable lines or as one JSON object
//! per line for log collectors.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::error::{AppError, AppResult};

/// Initialize the tracing subscriber with stderr output.
///
/// This sets up structured logging with:
/// - Environment-based filtering (RUST_LOG or provided level)
/// - Pretty or JSON output
/// - Optional ANSI color control (pretty output only)
///
/// # Arguments
/// * `log_level` - Optional log level override (e.g., "debug", "info")
/// * `format` - Output format
/// * `no_color` - Disable colored output
///
/// # Example
/// ```no_run
/// use rulegate_core::config::LogFormat;
/// use rulegate_core::logging::init_logging;
///
/// init_logging(None, LogFormat::Json, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, format: LogFormat, no_color: bool) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(!no_color && supports_color()),
            )
            .try_init(),
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

/// Build the level filter from an explicit level, RUST_LOG, or "info".
fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))
}

/// Check if the terminal supports color output.
fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        assert!(build_filter(Some("debug")).is_ok());
        assert!(build_filter(Some("rulegate_ask=trace,info")).is_ok());
    }

    #[test]
    fn test_build_filter_rejects_bad_level() {
        let err = build_filter(Some("rulegate=loud")).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("Invalid log filter")));
    }

    #[test]
    fn test_init_logging_once() {
        // The only test in this crate that installs the global subscriber
        init_logging(Some("info"), LogFormat::Json, true).unwrap();

        let second = init_logging(Some("debug"), LogFormat::Pretty, true);
        assert!(matches!(second, Err(AppError::Config(_))));
    }
}
