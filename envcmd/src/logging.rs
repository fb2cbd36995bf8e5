//! Diagnostics via `tracing`, written to stderr.
//!
//! Command output goes to stdout through [`crate::io::console`]; everything
//! here (decode errors, failed commands, context fallbacks) goes to stderr,
//! prefixed by its level.

use std::io::{self, IsTerminal};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset, so errors and context
/// fallbacks are always shown.
///
/// # Example
/// ```bash
/// RUST_LOG=envcmd=debug envcmd list
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal())
                .without_time()
                .with_target(false)
                .compact(),
        )
        .init();
}
