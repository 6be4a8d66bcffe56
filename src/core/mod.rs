//! core
//!
//! Core domain types, configuration, and contribution layout.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RepoPath, etc.
//! - [`config`] - Configuration schema and loading
//! - [`contribution`] - Where contribution files live and how edits are signed
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod contribution;
pub mod types;
