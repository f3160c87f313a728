//! Console logging for flatcorpus.
//!
//! The library only emits `tracing` events; this module decides what reaches
//! the terminal. `RUST_LOG` overrides the level derived from the run's
//! [`Verbosity`].
//!
//! ```no_run
//! use flatcorpus::config::Verbosity;
//! use flatcorpus::logging;
//!
//! logging::init(Verbosity::default()).expect("Failed to initialize logging");
//! tracing::info!("Starting operation...");
//! ```

use crate::config::Verbosity;
use anyhow::{Context as _, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Build the filter for a run: `RUST_LOG` first, then the verbosity default.
pub fn env_filter(verbosity: Verbosity) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(verbosity.filter_directive()))
        .context("Failed to create env filter")
}

/// Initializes the global subscriber. Call once at startup.
///
/// # Errors
///
/// Returns error if the filter is invalid or a subscriber is already set.
pub fn init(verbosity: Verbosity) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_target(verbosity.is_verbose())
        .with_line_number(verbosity.is_verbose())
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter(verbosity)?)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(directive = verbosity.filter_directive(), "Logging initialized");

    Ok(())
}
