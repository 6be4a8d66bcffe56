//! amend::error
//!
//! Pipeline-level failures and the mapping from forge errors into them.

use thiserror::Error;

use crate::core::types::{BranchName, Oid};
use crate::forge::ForgeError;

/// Errors from an amend.
///
/// Each variant names the stage that failed. The ref is untouched for every
/// variant except a `RefUpdateFailed` whose cause was ambiguous.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmendError {
    /// The request was rejected before any network call.
    #[error("invalid amend request: {0}")]
    InvalidRequest(String),

    /// The branch does not exist on the remote.
    #[error("branch '{0}' not found")]
    RefNotFound(BranchName),

    /// The branch head could not be read.
    #[error("commit {0} not found")]
    CommitNotFound(Oid),

    /// The credential was missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A blob write was rejected.
    #[error("failed to write file content: {0}")]
    WriteFailed(ForgeError),

    /// The tree write was rejected.
    #[error("failed to build tree: {0}")]
    TreeBuildFailed(ForgeError),

    /// The commit write was rejected.
    #[error("failed to write commit: {0}")]
    CommitWriteFailed(ForgeError),

    /// The branch could not be moved.
    #[error("failed to update branch: {0}")]
    RefUpdateFailed(ForgeError),

    /// The branch moved while the amend was in flight.
    #[error("branch '{branch}' moved during amend: expected {expected}, found {actual}")]
    Conflict {
        /// Branch being amended
        branch: BranchName,
        /// Head read when the amend started
        expected: Oid,
        /// Head found just before the update
        actual: Oid,
    },

    /// Transport failure or timeout.
    #[error("network error: {0}")]
    Network(String),
}

/// Pipeline stage a forge call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Resolve,
    Inspect,
    WriteBlob,
    BuildTree,
    WriteCommit,
    UpdateRef,
}

impl Stage {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Stage::Resolve => "resolve ref",
            Stage::Inspect => "read commit",
            Stage::WriteBlob => "write blob",
            Stage::BuildTree => "write tree",
            Stage::WriteCommit => "write commit",
            Stage::UpdateRef => "update ref",
        }
    }
}

impl AmendError {
    /// Classify a forge error raised during `stage`.
    ///
    /// `subject` names what the stage was looking up, for the not-found cases.
    pub(crate) fn from_forge(
        stage: Stage,
        err: ForgeError,
        branch: &BranchName,
        subject: Option<&Oid>,
    ) -> Self {
        if err.is_auth() {
            return AmendError::Auth(err.to_string());
        }
        match (stage, err) {
            (_, ForgeError::NetworkError(msg)) => AmendError::Network(msg),
            (Stage::Resolve, ForgeError::NotFound(_)) => AmendError::RefNotFound(branch.clone()),
            (Stage::Inspect, ForgeError::NotFound(_)) => match subject {
                Some(id) => AmendError::CommitNotFound(id.clone()),
                None => AmendError::RefNotFound(branch.clone()),
            },
            (Stage::Resolve | Stage::Inspect, err) => AmendError::Network(err.to_string()),
            (Stage::WriteBlob, err) => AmendError::WriteFailed(err),
            (Stage::BuildTree, err) => AmendError::TreeBuildFailed(err),
            (Stage::WriteCommit, err) => AmendError::CommitWriteFailed(err),
            (Stage::UpdateRef, err) => AmendError::RefUpdateFailed(err),
        }
    }
}
