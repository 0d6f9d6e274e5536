//! File-based tracing setup.
//!
//! The terminal belongs to the frontend, so logs go to a file.

use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs the global subscriber writing to `config.file`.
///
/// `RUST_LOG` takes precedence over `config.filter`. A subscriber that is
/// already installed is left in place.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<()> {
    let log_file = File::create(config.file())?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.filter())),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}
