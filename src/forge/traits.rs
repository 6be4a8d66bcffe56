//! forge::traits
//!
//! The `GitDatabase` trait: a forge's object graph seen through its API.
//!
//! # Design
//!
//! The trait is async because every operation is a network round trip.
//! All methods return `Result` so callers can match on the failure kind.
//! Each method is one pipeline component of an amendment:
//!
//! | Component       | Method                          |
//! |-----------------|---------------------------------|
//! | RefResolver     | [`GitDatabase::resolve_ref`]    |
//! | CommitInspector | [`GitDatabase::get_commit`]     |
//! | BlobWriter      | [`GitDatabase::create_blob`]    |
//! | TreeBuilder     | [`GitDatabase::create_tree`]    |
//! | CommitWriter    | [`GitDatabase::create_commit`]  |
//! | RefUpdater      | [`GitDatabase::update_ref`]     |
//!
//! Responses are parsed into the typed records below at the network
//! boundary; nothing untyped escapes an implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{BranchName, FileMode, Oid, RepoPath, Signature};

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A precondition on the current remote state did not hold.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error, including timeouts.
    #[error("network error: {0}")]
    NetworkError(String),

    /// A successful response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ForgeError {
    /// Whether this error means the credential was missing or rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, ForgeError::AuthRequired | ForgeError::AuthFailed(_))
    }
}

/// A commit as returned by the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit id
    pub id: Oid,
    /// Root tree of the commit
    pub tree: Oid,
    /// Parent commits, in order
    pub parents: Vec<Oid>,
    /// Full commit message
    pub message: String,
    /// Author, when the forge reports one
    pub author: Option<Signature>,
}

/// One entry of a tree write relative to a base tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    /// Path of the entry
    pub path: RepoPath,
    /// Entry mode
    pub mode: FileMode,
    /// Blob to store at `path`, or `None` to delete `path`
    pub content: Option<Oid>,
}

impl TreeChange {
    /// Store `content` at `path`.
    pub fn upsert(path: RepoPath, mode: FileMode, content: Oid) -> Self {
        Self {
            path,
            mode,
            content: Some(content),
        }
    }

    /// Remove `path` from the base tree.
    pub fn delete(path: RepoPath, mode: FileMode) -> Self {
        Self {
            path,
            mode,
            content: None,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.content.is_none()
    }
}

/// Request to write a tree derived from a base tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTreeRequest {
    /// Tree whose entries are carried through unless changed
    pub base_tree: Oid,
    /// Entries to add, replace or delete
    pub changes: Vec<TreeChange>,
}

/// Request to write a commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommitRequest {
    /// Commit message
    pub message: String,
    /// Tree the commit snapshots (must already exist)
    pub tree: Oid,
    /// Parent commits, in order
    pub parents: Vec<Oid>,
    /// Author; the forge uses the token's identity when `None`
    pub author: Option<Signature>,
}

/// Request to move a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRefRequest {
    /// Branch to move
    pub branch: BranchName,
    /// Commit the branch should point at
    pub target: Oid,
    /// Commit the branch must currently point at, if enforced
    pub expected: Option<Oid>,
    /// Allow a non-fast-forward update
    pub force: bool,
}

/// A forge's git object database.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; blob writes are issued
/// concurrently from one task.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: the credential is missing or rejected
/// - `NotFound`: the ref or object doesn't exist
/// - `Conflict`: the remote moved under a precondition
/// - `ApiError`: the forge rejected the request
/// - `NetworkError`: check connectivity
#[async_trait]
pub trait GitDatabase: Send + Sync {
    /// Get the implementation name (e.g., "github", "mock").
    fn name(&self) -> &'static str;

    /// Resolve a branch to its head commit.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    async fn resolve_ref(&self, branch: &BranchName) -> Result<Oid, ForgeError>;

    /// Fetch a commit's tree, parents and message.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the commit does not exist
    async fn get_commit(&self, id: &Oid) -> Result<CommitInfo, ForgeError>;

    /// Store raw content, returning its content-addressed id.
    ///
    /// Writing identical content twice yields the same id.
    async fn create_blob(&self, content: &[u8]) -> Result<Oid, ForgeError>;

    /// Write a tree derived from `request.base_tree`.
    ///
    /// Entries not named in `request.changes` are carried through.
    ///
    /// # Errors
    ///
    /// - `ApiError` if the entry set is rejected (malformed path, unknown blob)
    async fn create_tree(&self, request: CreateTreeRequest) -> Result<Oid, ForgeError>;

    /// Write a commit object.
    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Oid, ForgeError>;

    /// Point a branch at a commit.
    ///
    /// # Errors
    ///
    /// - `Conflict` if `expected` is set and the branch points elsewhere
    /// - `ApiError` if the update is not a fast-forward and `force` is false
    async fn update_ref(&self, request: UpdateRefRequest) -> Result<(), ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn tree_change_constructors() {
        let path = RepoPath::new("k/qna.yaml").unwrap();
        let up = TreeChange::upsert(path.clone(), FileMode::Regular, oid('a'));
        assert!(!up.is_delete());
        assert_eq!(up.content, Some(oid('a')));

        let del = TreeChange::delete(path, FileMode::Regular);
        assert!(del.is_delete());
    }

    #[test]
    fn auth_errors_are_classified() {
        assert!(ForgeError::AuthRequired.is_auth());
        assert!(ForgeError::AuthFailed("expired".into()).is_auth());
        assert!(!ForgeError::RateLimited.is_auth());
        assert!(!ForgeError::NotFound("x".into()).is_auth());
    }

    #[test]
    fn forge_error_display() {
        assert_eq!(
            format!("{}", ForgeError::AuthRequired),
            "authentication required"
        );
        assert_eq!(
            format!("{}", ForgeError::AuthFailed("expired token".into())),
            "authentication failed: expired token"
        );
        assert_eq!(
            format!("{}", ForgeError::NotFound("ref heads/x".into())),
            "not found: ref heads/x"
        );
        assert_eq!(
            format!("{}", ForgeError::Conflict("moved".into())),
            "conflict: moved"
        );
        assert_eq!(format!("{}", ForgeError::RateLimited), "rate limited");
        assert_eq!(
            format!(
                "{}",
                ForgeError::ApiError {
                    status: 422,
                    message: "Validation failed".into()
                }
            ),
            "API error: 422 - Validation failed"
        );
        assert_eq!(
            format!("{}", ForgeError::NetworkError("connection refused".into())),
            "network error: connection refused"
        );
        assert_eq!(
            format!("{}", ForgeError::InvalidResponse("missing sha".into())),
            "invalid response: missing sha"
        );
    }
}
