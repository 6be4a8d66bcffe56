//! amend
//!
//! Replaces the tip commit of a remote branch with an amended sibling.
//!
//! # Architecture
//!
//! An amend never touches a working copy. It talks to the forge's object
//! database only:
//!
//! ```text
//! Resolving -> Inspecting -> WritingBlobs -> BuildingTree -> WritingCommit -> UpdatingRef -> Done
//!     \___________\______________\_______________\_______________\______________\-> Failed
//! ```
//!
//! 1. **Resolving**: read the branch head `H`
//! 2. **Inspecting**: read `H`'s tree `T` and parents `P`
//! 3. **WritingBlobs**: store every file's new content, concurrently
//! 4. **BuildingTree**: write `T'` on top of `T`, deleting vacated paths
//! 5. **WritingCommit**: write `C'` with tree `T'` and parents `P`
//! 6. **UpdatingRef**: move the branch from `H` to `C'`
//!
//! `C'` shares `H`'s parents, so the branch history reads as if `H` had
//! been written with the new content from the start.
//!
//! # Invariants
//!
//! - The branch is only moved in the last step; any earlier failure leaves
//!   it where it was
//! - Objects written by a failed amend are unreferenced and harmless
//! - Nothing is retried; callers restart from `Resolving`
//! - With `enforce_expected_head`, the branch only moves if it still
//!   points at `H`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use taxamend::amend::{AmendRequest, AmendSettings, Amender, FileReplacement};
//! use taxamend::core::types::{BranchName, RepoPath};
//! use taxamend::forge::mock::MockDatabase;
//!
//! # tokio_test::block_on(async {
//! let db = MockDatabase::new();
//! let root = db.seed_commit(&[], &[], "root");
//! let head = db.seed_commit(&[("k/qna.yaml", b"v1")], &[root.clone()], "add");
//! let branch = BranchName::new("contrib-123").unwrap();
//! db.set_ref(&branch, &head);
//!
//! let path = RepoPath::new("k/qna.yaml").unwrap();
//! let request = AmendRequest::new(branch.clone(), "update")
//!     .file(FileReplacement::in_place("document", path, b"v2".to_vec()));
//!
//! let amender = Amender::new(Arc::new(db.clone()), AmendSettings::default());
//! let outcome = amender.amend(request).await.unwrap();
//!
//! assert_eq!(outcome.previous_head, head);
//! assert_eq!(outcome.parents, vec![root]);
//! assert_eq!(db.ref_target(&branch), Some(outcome.commit));
//! # });
//! ```

mod error;
pub mod tree;

pub use error::AmendError;
pub use tree::{PathChange, TreeBuilder};

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{BranchName, FileMode, Oid, RepoPath, Signature};
use crate::forge::{
    CommitInfo, CreateCommitRequest, ForgeError, GitDatabase, UpdateRefRequest,
};
use error::Stage;

/// Default bound on a single forge call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved settings for an [`Amender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendSettings {
    /// Bound on each individual forge call
    pub call_timeout: Duration,
    /// Refuse to move the branch if it changed since it was resolved
    pub enforce_expected_head: bool,
    /// Mode for every written tree entry, replacing whatever mode an
    /// in-place replaced file had
    pub file_mode: FileMode,
}

impl Default for AmendSettings {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            enforce_expected_head: true,
            file_mode: FileMode::Regular,
        }
    }
}

/// New content for one file, with where it lived before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReplacement {
    /// What the file is for (e.g. "document", "attribution")
    pub role: String,
    /// Path in the head commit, if the file existed
    pub old_path: Option<RepoPath>,
    /// Path in the amended commit
    pub new_path: RepoPath,
    /// Full new content
    pub content: Vec<u8>,
}

impl FileReplacement {
    /// Replace the file at `path`.
    pub fn in_place(role: impl Into<String>, path: RepoPath, content: Vec<u8>) -> Self {
        Self {
            role: role.into(),
            old_path: Some(path.clone()),
            new_path: path,
            content,
        }
    }

    /// Add a file that did not exist before.
    pub fn added(role: impl Into<String>, path: RepoPath, content: Vec<u8>) -> Self {
        Self {
            role: role.into(),
            old_path: None,
            new_path: path,
            content,
        }
    }

    /// Move the file from `old_path` to `new_path` with new content.
    ///
    /// Equal paths are an in-place replace.
    pub fn moved(
        role: impl Into<String>,
        old_path: RepoPath,
        new_path: RepoPath,
        content: Vec<u8>,
    ) -> Self {
        Self {
            role: role.into(),
            old_path: Some(old_path),
            new_path,
            content,
        }
    }

    /// Whether the file leaves its old path.
    pub fn is_rename(&self) -> bool {
        self.old_path
            .as_ref()
            .is_some_and(|old| old != &self.new_path)
    }
}

/// Everything needed to amend a branch tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendRequest {
    pub branch: BranchName,
    pub files: Vec<FileReplacement>,
    pub message: String,
    /// Author of the amended commit; the forge picks one when `None`
    pub author: Option<Signature>,
}

impl AmendRequest {
    pub fn new(branch: BranchName, message: impl Into<String>) -> Self {
        Self {
            branch,
            files: Vec::new(),
            message: message.into(),
            author: None,
        }
    }

    /// Add a file replacement.
    pub fn file(mut self, file: FileReplacement) -> Self {
        self.files.push(file);
        self
    }

    /// Add several file replacements.
    pub fn files(mut self, files: impl IntoIterator<Item = FileReplacement>) -> Self {
        self.files.extend(files);
        self
    }

    pub fn author(mut self, author: Signature) -> Self {
        self.author = Some(author);
        self
    }

    /// Reject requests that can never succeed.
    pub fn validate(&self) -> Result<(), AmendError> {
        if self.files.is_empty() {
            return Err(AmendError::InvalidRequest("no files to write".into()));
        }
        if self.message.trim().is_empty() {
            return Err(AmendError::InvalidRequest("commit message is empty".into()));
        }
        let mut targets = HashSet::new();
        for file in &self.files {
            if !targets.insert(file.new_path.as_str()) {
                return Err(AmendError::InvalidRequest(format!(
                    "path '{}' is written more than once",
                    file.new_path
                )));
            }
        }
        Ok(())
    }
}

/// A blob written during an amend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBlob {
    pub role: String,
    pub path: RepoPath,
    pub id: Oid,
}

/// Result of a successful amend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendOutcome {
    /// Branch that was moved
    pub branch: BranchName,
    /// Head before the amend
    pub previous_head: Oid,
    /// The amended commit, now the branch head
    pub commit: Oid,
    /// Tree of the amended commit
    pub tree: Oid,
    /// Parents of the amended commit (the old head's parents)
    pub parents: Vec<Oid>,
    /// Blobs written, in request order
    pub blobs: Vec<WrittenBlob>,
}

/// Progress of an amend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmendState {
    Resolving,
    Inspecting,
    WritingBlobs,
    BuildingTree,
    WritingCommit,
    UpdatingRef,
    Done,
    Failed(AmendError),
}

impl AmendState {
    /// Whether no further transition can follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AmendState::Done | AmendState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            AmendState::Resolving => "resolving",
            AmendState::Inspecting => "inspecting",
            AmendState::WritingBlobs => "writing-blobs",
            AmendState::BuildingTree => "building-tree",
            AmendState::WritingCommit => "writing-commit",
            AmendState::UpdatingRef => "updating-ref",
            AmendState::Done => "done",
            AmendState::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for AmendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs amends against one forge.
///
/// Settings are fixed at construction; nothing is read from the
/// environment while an amend runs.
#[derive(Clone)]
pub struct Amender {
    db: Arc<dyn GitDatabase>,
    settings: AmendSettings,
}

impl std::fmt::Debug for Amender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Amender")
            .field("db", &self.db.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Amender {
    pub fn new(db: Arc<dyn GitDatabase>, settings: AmendSettings) -> Self {
        Self { db, settings }
    }

    pub fn settings(&self) -> &AmendSettings {
        &self.settings
    }

    /// Amend the tip of `request.branch`.
    ///
    /// # Errors
    ///
    /// The first failing stage's [`AmendError`]. The branch is unchanged
    /// unless the error is a `RefUpdateFailed` from an ambiguous update.
    pub async fn amend(&self, request: AmendRequest) -> Result<AmendOutcome, AmendError> {
        self.amend_with_progress(request, |_| {}).await
    }

    /// Like [`amend`](Self::amend), reporting every state transition to
    /// `observer`, ending with `Done` or `Failed`.
    pub async fn amend_with_progress<F>(
        &self,
        request: AmendRequest,
        mut observer: F,
    ) -> Result<AmendOutcome, AmendError>
    where
        F: FnMut(&AmendState) + Send,
    {
        let result = self.run(&request, &mut observer).await;
        match &result {
            Ok(_) => observer(&AmendState::Done),
            Err(e) => observer(&AmendState::Failed(e.clone())),
        }
        result
    }

    /// Read the head commit of `branch`.
    pub async fn inspect(&self, branch: &BranchName) -> Result<CommitInfo, AmendError> {
        let head = self
            .call(Stage::Resolve, self.db.resolve_ref(branch))
            .await
            .map_err(|e| AmendError::from_forge(Stage::Resolve, e, branch, None))?;
        self.call(Stage::Inspect, self.db.get_commit(&head))
            .await
            .map_err(|e| AmendError::from_forge(Stage::Inspect, e, branch, Some(&head)))
    }

    /// Await one forge call under the per-call timeout.
    async fn call<T, Fut>(&self, stage: Stage, fut: Fut) -> Result<T, ForgeError>
    where
        Fut: Future<Output = Result<T, ForgeError>>,
    {
        let limit = self.settings.call_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ForgeError::NetworkError(format!(
                "{} timed out after {}ms",
                stage.name(),
                limit.as_millis()
            ))),
        }
    }

    #[instrument(skip_all, fields(branch = %request.branch, db = self.db.name()))]
    async fn run<F>(
        &self,
        request: &AmendRequest,
        observer: &mut F,
    ) -> Result<AmendOutcome, AmendError>
    where
        F: FnMut(&AmendState) + Send,
    {
        let branch = &request.branch;
        let mut enter = |state: AmendState| {
            debug!(state = %state, "amend state");
            observer(&state);
        };

        request.validate()?;

        enter(AmendState::Resolving);
        let head = self
            .call(Stage::Resolve, self.db.resolve_ref(branch))
            .await
            .map_err(|e| AmendError::from_forge(Stage::Resolve, e, branch, None))?;
        debug!(head = %head, "resolved branch");

        enter(AmendState::Inspecting);
        let commit = self
            .call(Stage::Inspect, self.db.get_commit(&head))
            .await
            .map_err(|e| AmendError::from_forge(Stage::Inspect, e, branch, Some(&head)))?;
        debug!(tree = %commit.tree, parents = commit.parents.len(), "inspected head");

        enter(AmendState::WritingBlobs);
        let writes = request
            .files
            .iter()
            .map(|file| self.call(Stage::WriteBlob, self.db.create_blob(&file.content)));
        let blob_ids = try_join_all(writes)
            .await
            .map_err(|e| AmendError::from_forge(Stage::WriteBlob, e, branch, None))?;

        let blobs: Vec<WrittenBlob> = request
            .files
            .iter()
            .zip(blob_ids)
            .map(|(file, id)| {
                debug!(role = %file.role, path = %file.new_path, blob = %id, "wrote blob");
                WrittenBlob {
                    role: file.role.clone(),
                    path: file.new_path.clone(),
                    id,
                }
            })
            .collect();

        enter(AmendState::BuildingTree);
        let changes: Vec<PathChange> = request
            .files
            .iter()
            .zip(&blobs)
            .map(|(file, blob)| PathChange {
                old_path: file.old_path.clone(),
                new_path: file.new_path.clone(),
                content: blob.id.clone(),
            })
            .collect();
        let tree_request = TreeBuilder::new(self.settings.file_mode).request(&commit.tree, &changes)?;
        let tree = self
            .call(Stage::BuildTree, self.db.create_tree(tree_request))
            .await
            .map_err(|e| AmendError::from_forge(Stage::BuildTree, e, branch, None))?;
        debug!(tree = %tree, "wrote tree");

        enter(AmendState::WritingCommit);
        let new_commit = self
            .call(
                Stage::WriteCommit,
                self.db.create_commit(CreateCommitRequest {
                    message: request.message.clone(),
                    tree: tree.clone(),
                    parents: commit.parents.clone(),
                    author: request.author.clone(),
                }),
            )
            .await
            .map_err(|e| AmendError::from_forge(Stage::WriteCommit, e, branch, None))?;
        debug!(commit = %new_commit, "wrote commit");

        enter(AmendState::UpdatingRef);
        self.move_branch(branch, &head, &new_commit).await?;

        info!(
            previous = %head.short(7),
            commit = %new_commit.short(7),
            "amended branch"
        );

        Ok(AmendOutcome {
            branch: branch.clone(),
            previous_head: head,
            commit: new_commit,
            tree,
            parents: commit.parents,
            blobs,
        })
    }

    /// Move `branch` from `head` to `target`.
    async fn move_branch(
        &self,
        branch: &BranchName,
        head: &Oid,
        target: &Oid,
    ) -> Result<(), AmendError> {
        let expected = if self.settings.enforce_expected_head {
            let current = self
                .call(Stage::Resolve, self.db.resolve_ref(branch))
                .await
                .map_err(|e| AmendError::from_forge(Stage::Resolve, e, branch, None))?;
            if &current != head {
                return Err(AmendError::Conflict {
                    branch: branch.clone(),
                    expected: head.clone(),
                    actual: current,
                });
            }
            Some(head.clone())
        } else {
            None
        };

        let update = UpdateRefRequest {
            branch: branch.clone(),
            target: target.clone(),
            expected,
            force: true,
        };
        let err = match self.call(Stage::UpdateRef, self.db.update_ref(update)).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if err.is_auth() {
            return Err(AmendError::from_forge(Stage::UpdateRef, err, branch, None));
        }

        let current = self
            .call(Stage::Resolve, self.db.resolve_ref(branch))
            .await
            .ok();

        if let ForgeError::Conflict(_) = err {
            return Err(match current {
                Some(actual) if &actual != head => AmendError::Conflict {
                    branch: branch.clone(),
                    expected: head.clone(),
                    actual,
                },
                _ => AmendError::RefUpdateFailed(err),
            });
        }

        if current.as_ref() == Some(target) {
            warn!(error = %err, "ref update reported failure but branch points at the amended commit");
            return Ok(());
        }
        Err(AmendError::from_forge(Stage::UpdateRef, err, branch, None))
    }
}
