//! ui
//!
//! Terminal output for the CLI.
//!
//! # Design
//!
//! Results go to stdout so they can be captured by scripts; diagnostics
//! go to stderr. Only errors survive `--quiet`.

pub mod output;
