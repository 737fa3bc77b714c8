//! Meridian command line front end
//!
//! Loads a catalog file, resolves its resources and plans filtered
//! collection queries, optionally running them against SQLite.
//!
//! - [`config`] - Command line options and environment variables
//! - [`catalog`] - Catalog files and the resolved application
//! - [`commands`] - Subcommand implementations

#![warn(missing_docs)]

pub mod catalog;
pub mod commands;
pub mod config;

pub use catalog::{Application, CatalogFile};
pub use config::{Cli, Command};

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Logs go to stderr so command
/// output stays parseable.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "meridian_cli={0},meridian_metadata={0},meridian_filter={0}",
            level
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
