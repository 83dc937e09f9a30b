//! Structured logging setup using `tracing-subscriber`.
//!
//! The library itself only emits `tracing` events; host binaries pick an
//! init. Both inits are no-ops when a subscriber is already installed, so
//! they are safe to call from tests.

use tracing_subscriber::EnvFilter;

/// Initialise human-readable logging on stderr.
///
/// Controlled by `RUST_LOG` (default: `info`).
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Initialise JSON logging on stderr for log-shipping environments.
///
/// Controlled by `RUST_LOG` (default: `info`).
pub fn init_json() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
