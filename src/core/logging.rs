//! Logging setup
//!
//! `RUST_LOG` takes precedence over the level passed in.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::error::{Result, ScoutError};

/// Install the global tracing subscriber
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level
            .parse::<tracing::Level>()
            .map_err(|e| ScoutError::config(format!("Invalid log level '{}': {}", level, e)))?
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| ScoutError::config(format!("Failed to install logger: {}", e)))
}
