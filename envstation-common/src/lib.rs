//! envstation common library
//!
//! Shared types and utilities for the environmental-station poller:
//!
//! - [`reading`] - Reading data model (`Quantity`, `Reading`, `ReadingSet`)
//! - [`config`] - Configuration loading (JSON5 format), logging and clock settings
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod reading;

// Re-export commonly used types at the crate root
pub use config::{ClockConfig, LogFormat, LoggingConfig, load_config, parse_config};
pub use error::{Error, Result};
pub use reading::{Quantity, Reading, ReadingSet, current_local_time};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
