//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the configuration and validates its arguments
//! 2. Builds the forge client and hands work to [`crate::amend`]
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Commands that talk to the forge are async because they involve network
//! I/O. Their sync entry points build a tokio runtime and block on the
//! async body.

mod amend;
mod config_cmd;
mod head;

pub use amend::amend;
pub use config_cmd::show as config_show;
pub use head::head;

use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::auth::StaticTokenProvider;
use crate::core::config::Config;
use crate::forge::github::GitHubDatabase;
use crate::forge::GitDatabase;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Amend(args) => amend::amend(ctx, &args),
        Command::Head { branch } => head::head(ctx, &branch),
        Command::Config => config_cmd::show(ctx),
    }
}

/// Load the configuration selected by `--config` or the search path.
pub(crate) fn load_config(ctx: &Context) -> Result<Config> {
    let loaded = Config::load(ctx.config_path.as_deref()).context("Failed to load config")?;
    if let Some(path) = &loaded.path {
        tracing::debug!(path = %path.display(), "loaded config");
    }
    Ok(loaded.config)
}

/// Build the GitHub client for the configured fork.
pub(crate) fn connect(config: &Config) -> Result<Arc<dyn GitDatabase>> {
    let var = config.token_env();
    let provider = StaticTokenProvider::from_env(var)
        .with_context(|| format!("Set {var} to a token with write access to the fork"))?;
    let db = GitHubDatabase::from_settings(&config.forge_settings(), Arc::new(provider))
        .context("Failed to create GitHub client")?;
    Ok(Arc::new(db))
}
