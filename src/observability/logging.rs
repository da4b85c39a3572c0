//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for the log collector, pretty format for development
//! - Level comes from config (`log_level`, shared with the geocoding engine)
//!   and is overridden by `RUST_LOG`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Map a config level name to a tracing filter directive.
///
/// Accepts tracing names as well as the syslog-style names the geocoding
/// engine uses ("WARNING", "CRITICAL", ...).
pub fn level_directive(level: Option<&str>) -> &'static str {
    match level.map(str::to_ascii_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") | Some("critical") | Some("fatal") => "error",
        _ => "info",
    }
}

/// Install the global subscriber.
pub fn init_logging(level: Option<&str>, format: LogFormat) {
    let default_filter = format!(
        "geocode_gateway={level},tower_http={level}",
        level = level_directive(level)
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
