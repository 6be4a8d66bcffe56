//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of searching
//! - `--verbose` / `-v`: Debug logging
//! - `--quiet` / `-q`: Minimal output, no logging

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::contribution::ContributionKind;

/// taxamend - amend the tip commit of a taxonomy contribution branch
#[derive(Parser, Debug)]
#[command(name = "taxamend")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace the tip commit of a contribution branch with new content
    #[command(
        long_about = "Replace the tip commit of a contribution branch with new content.\n\n\
            Both contribution files are rewritten through the forge API and the \
            branch is moved to an amended commit that keeps the original parents. \
            When --old-path differs from --path, the files are moved and the old \
            ones removed.",
        after_help = "\
EXAMPLES:
    # Edit a knowledge contribution in place
    taxamend amend --branch contrib-123 --kind knowledge --path science/physics \\
        --document qna.yaml --attribution attribution.txt \\
        --name 'Ada Lovelace' --email ada@example.com

    # Move a skill contribution to a new directory
    taxamend amend --branch contrib-9 --kind skill \\
        --old-path writing/poems --path writing/haiku \\
        --document qna.yaml --attribution attribution.txt \\
        --name 'Ada Lovelace' --email ada@example.com --pr 42"
    )]
    Amend(AmendArgs),

    /// Show the head commit of a branch
    Head {
        /// Branch on the fork
        branch: String,
    },

    /// Print the effective configuration
    Config,
}

/// Arguments of `taxamend amend`.
#[derive(Args, Debug)]
pub struct AmendArgs {
    /// Branch holding the contribution
    #[arg(long)]
    pub branch: String,

    /// Contribution kind
    #[arg(long, value_name = "knowledge|skill")]
    pub kind: ContributionKind,

    /// Contribution directory under the kind's root
    #[arg(long, value_name = "DIR")]
    pub path: String,

    /// Directory the contribution lived in before, if it moved
    #[arg(long, value_name = "DIR")]
    pub old_path: Option<String>,

    /// New content of the contribution's qna.yaml
    #[arg(long, value_name = "FILE")]
    pub document: PathBuf,

    /// New content of the contribution's attribution.txt
    #[arg(long, value_name = "FILE")]
    pub attribution: PathBuf,

    /// Signer name for the Signed-off-by trailer
    #[arg(long)]
    pub name: String,

    /// Signer email for the Signed-off-by trailer
    #[arg(long)]
    pub email: String,

    /// First line of the commit message
    #[arg(long)]
    pub summary: Option<String>,

    /// Pull request number to link after amending
    #[arg(long, value_name = "NUMBER")]
    pub pr: Option<u64>,
}
