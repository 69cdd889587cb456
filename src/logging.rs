//! Tracing subscriber setup.
//!
//! Logs go to stdout with a compact formatter. Filtering respects
//! `RUST_LOG` and defaults to `info`. Ingestion runs as fire-and-forget
//! background work whose failures surface only through the ledger, so the
//! log stream is the one place stage-level errors are visible.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber. Call once, before any command runs.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}
