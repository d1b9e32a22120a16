//! # Process-wide `tracing` setup.
//!
//! Available with the `logging` feature. Installs a formatting layer filtered by
//! `RUST_LOG` (default `info`), so that both the engine's own diagnostics and
//! [`LogWriter`](crate::LogWriter) output become visible.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .try_init()
}
