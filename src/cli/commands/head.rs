//! cli::commands::head
//!
//! Show the head commit of a contribution branch.
//!
//! # Example
//!
//! ```bash
//! taxamend head contrib-123
//! ```

use super::{connect, load_config};
use crate::amend::Amender;
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::ui::output;
use anyhow::{Context as _, Result};

/// Run the head command.
pub fn head(ctx: &Context, branch: &str) -> Result<()> {
    let branch = BranchName::new(branch).context("Invalid branch name")?;
    let config = load_config(ctx)?;
    let db = connect(&config)?;
    let amender = Amender::new(db, config.amend_settings());

    let rt = tokio::runtime::Runtime::new()?;
    let commit = rt
        .block_on(amender.inspect(&branch))
        .with_context(|| format!("Failed to read head of '{}'", branch))?;

    output::result(&commit.id);
    output::field("tree", &commit.tree, ctx.verbosity);
    for parent in &commit.parents {
        output::field("parent", parent, ctx.verbosity);
    }
    if let Some(summary) = commit.message.lines().next() {
        output::print(format!("\n    {}", summary), ctx.verbosity);
    }
    Ok(())
}
