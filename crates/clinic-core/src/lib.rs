//! Settings and error classes shared by the clinic dashboard crates.

pub mod config;
pub mod error;

pub use config::{ApiConfig, CalendarConfig, Config, QueryConfig, ValidationResult};
pub use error::{AppError, ConfigError, NetworkError};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the log subscriber. `RUST_LOG` overrides the default `info` level.
///
/// A second call is a no-op.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        tracing::debug!(version = env!("CARGO_PKG_VERSION"), "logging ready");
    }
    Ok(())
}
