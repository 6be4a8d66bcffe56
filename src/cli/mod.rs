//! cli
//!
//! Command-line interface layer for taxamend.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the log subscriber
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, loads the
//! configuration and dispatches to a handler. Handlers that talk to the
//! forge build their own runtime and hand the work to [`crate::amend`].

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::ui::output::Verbosity;

/// Per-invocation settings shared by every handler.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file from `--config`
    pub config_path: Option<PathBuf>,
    pub verbosity: Verbosity,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = Context {
        config_path: cli.config.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.verbose),
    };
    init_tracing(ctx.verbosity);

    commands::dispatch(cli.command, &ctx)
}

/// Install a stderr log subscriber.
///
/// `--verbose` and `--quiet` win over `RUST_LOG`; otherwise `RUST_LOG`
/// applies, defaulting to warnings only.
fn init_tracing(verbosity: Verbosity) {
    let filter = match verbosity {
        Verbosity::Debug => EnvFilter::new("taxamend=debug,warn"),
        Verbosity::Quiet => EnvFilter::new("off"),
        Verbosity::Normal => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    };
    // A subscriber may already be installed when run() is embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
