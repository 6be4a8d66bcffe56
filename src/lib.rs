//! taxamend - amend the tip commit of a taxonomy contribution branch
//!
//! Contributions to a taxonomy repository live on branches of a fork, one
//! commit per contribution. Editing a contribution replaces that commit
//! with an amended sibling, written entirely through the forge's git
//! object API. No local clone is involved.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to amend)
//! - [`amend`] - The amend pipeline: resolve, inspect, write, update
//! - [`forge`] - The forge's object database (GitHub, mock)
//! - [`auth`] - Bearer tokens for the forge API
//! - [`core`] - Domain types, configuration, contribution layout
//! - [`ui`] - Output helpers
//!
//! # Correctness Invariants
//!
//! 1. The branch ref is the only remote state an amend mutates
//! 2. The branch moves last, after every object it references exists
//! 3. The amended commit keeps the original commit's parents
//! 4. A branch that moved during the amend is never overwritten

pub mod amend;
pub mod auth;
pub mod cli;
pub mod core;
pub mod forge;
pub mod ui;
