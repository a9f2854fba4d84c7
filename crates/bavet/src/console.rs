//! Log output for applications embedding Bavet.
//!
//! Sessions report through `tracing`: `debug` for plan compilation,
//! `trace` per propagated layer and `error` when a session is poisoned.

use std::sync::OnceLock;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Installs a formatting subscriber honouring `RUST_LOG`, defaulting to
/// `info`.
///
/// Safe to call multiple times - only the first call has effect, and an
/// already installed global subscriber is left in place.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy();

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
