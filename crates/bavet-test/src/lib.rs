//! Shared test fixtures for Bavet crates.
//!
//! This crate provides a fact model and pure from-scratch score functions.
//! It depends only on `bavet-core` so that `bavet-scoring` can use it as a
//! dev-dependency without a cycle.
//!
//! - [`value`] - the [`Value`] fact enum used by every engine test
//! - [`nqueens`] - N-Queens facts and brute-force conflict counting
//! - [`timetable`] - lesson scheduling facts and brute-force conflict counting
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! bavet-test = { workspace = true }
//! ```

pub mod nqueens;
pub mod timetable;
pub mod value;

pub use value::{Class, Value};

/// Installs a `tracing` subscriber honouring `RUST_LOG`, once per process.
///
/// Safe to call from every test; later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
