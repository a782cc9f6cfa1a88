//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directive used when neither `RUST_LOG` nor the config sets a level.
pub const DEFAULT_DIRECTIVE: &str = "tree_router=info,tower_http=info";

/// Build the filter for `log_level` (e.g. "debug", or a full directive list).
pub fn env_filter(log_level: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = match log_level {
        Some(level) if !level.contains('=') => format!("tree_router={level},tower_http={level}"),
        Some(directives) => directives.to_string(),
        None => DEFAULT_DIRECTIVE.to_string(),
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(log_level: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
