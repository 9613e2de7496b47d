//! # neonaop-runner
//!
//! Library side of the `neonaop` command-line tool: YAML configuration,
//! logging setup, and the command implementations behind each subcommand.

pub mod commands;
pub mod config;
mod error;

pub use config::RunnerConfig;
pub use error::RunnerError;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// An explicit level wins; otherwise `RUST_LOG` is used, falling back to `info`.
pub fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // A subscriber may already be installed, e.g. by a test harness.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
