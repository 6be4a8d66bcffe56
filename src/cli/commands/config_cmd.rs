//! config command - Print the effective configuration

use super::load_config;
use crate::cli::Context;
use anyhow::{Context as _, Result};

/// Print the configuration with every default applied, as TOML.
pub fn show(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let rendered =
        toml::to_string_pretty(&config.effective()).context("Failed to render config")?;
    print!("{}", rendered);
    Ok(())
}
