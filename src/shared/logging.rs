//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence; otherwise the configured level applies to
//! everything, with this crate pinned to at least the same level.

use tracing_subscriber::EnvFilter;

use super::error::{AppError, AppResult};

fn build_filter_directives(level: &str) -> Vec<String> {
    vec![
        level.to_string(),
        format!("clipkeeper_lib={}", level),
        format!("clipkeeper={}", level),
    ]
}

/// Install the global fmt subscriber. Call once, before anything logs.
pub fn init_tracing_subscriber(level: &str) -> AppResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(build_filter_directives(level).join(",")))
        .map_err(|e| AppError::Validation(format!("Invalid log level '{}': {}", level, e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|e| AppError::System(format!("Failed to initialize tracing: {}", e)))
}
