//! Opt-in tracing subscriber.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber for debug output.
///
/// Does nothing unless `RUST_LOG` is set, and only installs once per
/// process, so tests and drivers may call it freely.
/// Enable with `RUST_LOG=ossa_opt=debug` (per-function summaries) or
/// `RUST_LOG=ossa_opt::move_elim=trace` (every move decision).
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
