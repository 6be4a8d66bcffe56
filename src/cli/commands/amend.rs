//! cli::commands::amend
//!
//! Rewrite a contribution's files and amend its branch tip.
//!
//! # Design
//!
//! The command:
//! - Locates the contribution files from `--kind` and `--path`
//! - Moves them from `--old-path` when the contribution changed directory
//! - Signs the commit message off with `--name` / `--email`
//! - Prints the amended commit id, and the PR link with `--pr`
//!
//! Everything that can be checked locally is checked before a token is
//! read or the network is touched.

use std::fs;

use super::{connect, load_config};
use crate::amend::{AmendError, AmendRequest, Amender};
use crate::cli::args::AmendArgs;
use crate::cli::Context;
use crate::core::contribution::{
    pull_request_url, signed_off_message, ContributionFiles, DEFAULT_AMEND_SUMMARY,
};
use crate::core::types::{BranchName, Signature};
use crate::ui::output;
use anyhow::{bail, Context as _, Result};

/// Build the amend request described by `args`.
pub(crate) fn build_request(args: &AmendArgs) -> Result<AmendRequest> {
    let branch = BranchName::new(args.branch.as_str()).context("Invalid branch name")?;

    if args.name.trim().is_empty() {
        bail!("--name must not be empty");
    }
    if !args.email.contains('@') {
        bail!("--email must be an email address, got '{}'", args.email);
    }
    let signer = Signature::new(args.name.trim(), args.email.trim());

    let target =
        ContributionFiles::new(args.kind, &args.path).context("Invalid contribution path")?;
    let previous = match &args.old_path {
        Some(old) => ContributionFiles::new(args.kind, old).context("Invalid old contribution path")?,
        None => target.clone(),
    };

    let document = fs::read(&args.document)
        .with_context(|| format!("Failed to read {}", args.document.display()))?;
    let attribution = fs::read(&args.attribution)
        .with_context(|| format!("Failed to read {}", args.attribution.display()))?;

    let summary = args.summary.as_deref().unwrap_or(DEFAULT_AMEND_SUMMARY);
    Ok(AmendRequest::new(branch, signed_off_message(summary, &signer))
        .files(target.replacements(&previous, document, attribution))
        .author(signer))
}

/// Run the amend command.
pub fn amend(ctx: &Context, args: &AmendArgs) -> Result<()> {
    let request = build_request(args)?;
    let config = load_config(ctx)?;
    let db = connect(&config)?;
    let amender = Amender::new(db, config.amend_settings());
    let verbosity = ctx.verbosity;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(amender.amend_with_progress(request, |state| {
        output::progress(state, verbosity)
    }));

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err @ AmendError::Conflict { .. }) => {
            output::warn(
                "the branch changed while amending; reload the contribution and retry",
                verbosity,
            );
            return Err(err).context(format!("Failed to amend '{}'", args.branch));
        }
        Err(err) => return Err(err).context(format!("Failed to amend '{}'", args.branch)),
    };

    output::result(&outcome.commit);
    output::success(
        format!(
            "Amended {} ({} -> {})",
            outcome.branch,
            outcome.previous_head.short(7),
            outcome.commit.short(7)
        ),
        verbosity,
    );
    if let Some(number) = args.pr {
        let url = pull_request_url(
            config.web_base(),
            config.upstream_owner(),
            config.repo(),
            number,
        );
        output::print(format!("Pull request: {}", url), verbosity);
    }
    Ok(())
}
