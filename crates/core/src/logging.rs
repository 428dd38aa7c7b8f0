//! Tracing setup.
//!
//! Logs go to stderr; stdout is reserved for command output such as
//! ingest stats and query results.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Install the global tracing subscriber.
///
/// The filter comes from `log_level` when given, otherwise from
/// `RUST_LOG`, defaulting to `info`. Colors are suppressed by the
/// `no_color` flag or the `NO_COLOR` environment variable.
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let env_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(log_level.unwrap_or(&env_level))
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    let ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(ansi),
        )
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}
