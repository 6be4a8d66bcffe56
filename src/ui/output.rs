//! ui::output
//!
//! What the commands print, and where.
//!
//! # Design
//!
//! A command's result (a commit id) is written with [`result`] and is
//! printed even under `--quiet`, so `$(taxamend amend ...)` captures it.
//! Details and links go to stdout in normal mode. Warnings, progress and
//! errors go to stderr.

use std::fmt::Display;

/// Width of the label column in [`field`] lines, as in `git cat-file -p`.
const LABEL_WIDTH: usize = 8;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Result line and errors only
    Quiet,
    #[default]
    Normal,
    /// Also reports amend progress
    Debug,
}

impl Verbosity {
    /// `quiet` wins when both flags are set.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Debug,
            (false, false) => Verbosity::Normal,
        }
    }

    fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}

/// Print the command's result. Never suppressed.
pub fn result(value: impl Display) {
    println!("{}", value);
}

/// Print a detail line.
pub fn print(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        println!("{}", message);
    }
}

/// Format a `label value` line with the label padded to a fixed column.
pub fn format_field(label: &str, value: impl Display) -> String {
    format!("{:<width$}{}", label, value, width = LABEL_WIDTH)
}

/// Print a `label value` detail line.
pub fn field(label: &str, value: impl Display, verbosity: Verbosity) {
    print(format_field(label, value), verbosity);
}

/// Report a pipeline step (debug mode only).
pub fn progress(step: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[amend] {}", step);
    }
}

pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

pub fn warn(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        eprintln!("warning: {}", message);
    }
}

/// Print a one-line summary after a successful change.
pub fn success(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        println!("{}", message);
    }
}
