//! forge
//!
//! Access to a remote forge's git object database.
//!
//! # Architecture
//!
//! The `GitDatabase` trait defines the object-level operations an amend
//! needs: resolve a branch, read a commit, and write blobs, trees, commits
//! and refs. The amend pipeline only ever sees `dyn GitDatabase`, so the
//! GitHub client and the in-memory mock are interchangeable.
//!
//! Objects written to the forge are immutable and content-addressed. Only
//! a ref update changes anything a reader can observe.
//!
//! # Modules
//!
//! - `traits`: Core `GitDatabase` trait and request/response types
//! - [`github`]: GitHub implementation over the REST git data API
//! - [`mock`]: In-memory object store for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
