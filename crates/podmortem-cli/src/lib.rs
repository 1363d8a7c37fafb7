//! Podmortem CLI library.
//!
//! This crate provides the CLI interface for the dispatch engine.

mod cli;
pub mod commands;

pub use cli::{Cli, Commands};

use tracing_subscriber::EnvFilter;

/// Log filter for the binary: `debug` when verbose, otherwise `RUST_LOG`.
pub fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    }
}

/// Install the global subscriber. Logs go to stderr; stdout carries JSON output.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}
