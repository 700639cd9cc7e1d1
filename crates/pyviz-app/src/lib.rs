pub mod commands;
pub mod gui;
pub mod watch;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the log subscriber. Safe to call more than once; does nothing
/// unless `RUST_LOG` is set (e.g. `RUST_LOG=pyviz_lang=debug`).
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
