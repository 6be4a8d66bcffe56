//! forge::mock
//!
//! In-memory git object database for deterministic testing.
//!
//! # Design
//!
//! The mock behaves like the remote rather than merely recording calls:
//! - blob ids are real git blob hashes (`sha1("blob <len>\0" ++ content)`)
//! - trees are flat `path -> entry` maps, identified by a SHA-1 over their
//!   sorted entries, so equal entry sets always share an id
//! - tree writes reject unknown blobs, deletions of absent paths, duplicate
//!   paths, and file/directory clashes, the way the forge answers 422
//! - ref updates enforce `expected` atomically and refuse non-fast-forward
//!   moves unless forced
//!
//! Failures, latency and a concurrent push can be injected to drive the
//! error paths of callers.
//!
//! # Example
//!
//! ```
//! use taxamend::core::types::BranchName;
//! use taxamend::forge::mock::MockDatabase;
//! use taxamend::forge::GitDatabase;
//!
//! # tokio_test::block_on(async {
//! let db = MockDatabase::new();
//! let head = db.seed_commit(&[("k/qna.yaml", b"v1")], &[], "initial");
//! let branch = BranchName::new("contrib-123").unwrap();
//! db.set_ref(&branch, &head);
//!
//! assert_eq!(db.resolve_ref(&branch).await.unwrap(), head);
//! let blob = db.create_blob(b"v1").await.unwrap();
//! assert_eq!(db.create_blob(b"v1").await.unwrap(), blob);
//! # });
//! ```

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::traits::{
    CommitInfo, CreateCommitRequest, CreateTreeRequest, ForgeError, GitDatabase, TreeChange,
    UpdateRefRequest,
};
use crate::core::types::{BranchName, FileMode, Oid, Signature};

/// Mock git database for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockDatabase {
    inner: Arc<Mutex<MockDatabaseInner>>,
}

/// A file entry in a mock tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockEntry {
    pub mode: FileMode,
    pub blob: Oid,
}

#[derive(Debug, Default)]
struct MockDatabaseInner {
    blobs: HashMap<Oid, Vec<u8>>,
    trees: HashMap<Oid, BTreeMap<String, MockEntry>>,
    commits: HashMap<Oid, CommitInfo>,
    refs: HashMap<BranchName, Oid>,
    /// Operation to fail (for testing error paths).
    fail_on: Option<FailOn>,
    /// Ref move applied by the next commit write, mimicking another writer.
    concurrent_push: Option<(BranchName, Oid)>,
    /// Delay added to every call.
    latency: Option<Duration>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
    blob_writes_in_flight: usize,
    max_blob_writes_in_flight: usize,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every resolve_ref with the given error.
    ResolveRef(ForgeError),
    /// Fail get_commit with the given error.
    GetCommit(ForgeError),
    /// Fail create_blob with the given error.
    CreateBlob(ForgeError),
    /// Fail create_tree with the given error.
    CreateTree(ForgeError),
    /// Fail create_commit with the given error.
    CreateCommit(ForgeError),
    /// Fail update_ref without moving the ref.
    UpdateRef(ForgeError),
    /// Move the ref, then report the given error (a lost response).
    UpdateRefAfterWrite(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ResolveRef {
        branch: BranchName,
    },
    GetCommit {
        id: Oid,
    },
    CreateBlob {
        len: usize,
    },
    CreateTree {
        base_tree: Oid,
        changes: Vec<TreeChange>,
    },
    CreateCommit {
        tree: Oid,
        parents: Vec<Oid>,
        message: String,
    },
    UpdateRef {
        branch: BranchName,
        target: Oid,
        expected: Option<Oid>,
        force: bool,
    },
}

fn hash_object(kind: &str, payload: &[u8]) -> Oid {
    let mut hasher = Sha1::new();
    hasher.update(kind.as_bytes());
    hasher.update(b" ");
    hasher.update(payload.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(payload);
    // SHA-1 digests are always 20 bytes, which always forms a valid id
    Oid::from_digest(&hasher.finalize()).unwrap_or_else(|_| unreachable!())
}

/// Git blob id of `content`.
pub fn blob_id(content: &[u8]) -> Oid {
    hash_object("blob", content)
}

fn tree_id(entries: &BTreeMap<String, MockEntry>) -> Oid {
    let mut payload = Vec::new();
    for (path, entry) in entries {
        payload.extend_from_slice(entry.mode.as_str().as_bytes());
        payload.push(b' ');
        payload.extend_from_slice(path.as_bytes());
        payload.push(0);
        payload.extend_from_slice(entry.blob.as_str().as_bytes());
        payload.push(b'\n');
    }
    hash_object("tree", &payload)
}

fn commit_id(tree: &Oid, parents: &[Oid], author: Option<&Signature>, message: &str) -> Oid {
    let mut payload = format!("tree {}\n", tree);
    for parent in parents {
        payload.push_str(&format!("parent {}\n", parent));
    }
    let stamp = chrono::Utc::now();
    let who = author
        .map(|a| a.to_string())
        .unwrap_or_else(|| "mock <mock@localhost>".to_string());
    payload.push_str(&format!(
        "author {} {}.{:09} +0000\n\n{}",
        who,
        stamp.timestamp(),
        stamp.timestamp_subsec_nanos(),
        message
    ));
    hash_object("commit", payload.as_bytes())
}

fn rejected(message: impl Into<String>) -> ForgeError {
    ForgeError::ApiError {
        status: 422,
        message: message.into(),
    }
}

impl MockDatabaseInner {
    fn check_fail(&self, op: &str) -> Result<(), ForgeError> {
        let err = match (&self.fail_on, op) {
            (Some(FailOn::ResolveRef(e)), "resolve_ref")
            | (Some(FailOn::GetCommit(e)), "get_commit")
            | (Some(FailOn::CreateBlob(e)), "create_blob")
            | (Some(FailOn::CreateTree(e)), "create_tree")
            | (Some(FailOn::CreateCommit(e)), "create_commit")
            | (Some(FailOn::UpdateRef(e)), "update_ref") => e.clone(),
            _ => return Ok(()),
        };
        Err(err)
    }

    fn store_tree(&mut self, entries: BTreeMap<String, MockEntry>) -> Oid {
        let id = tree_id(&entries);
        self.trees.insert(id.clone(), entries);
        id
    }

    /// Whether `ancestor` is reachable from `commit` through parent links.
    fn is_descendant(&self, commit: &Oid, ancestor: &Oid) -> bool {
        let mut queue = VecDeque::from([commit.clone()]);
        let mut seen = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if &id == ancestor {
                return true;
            }
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(info) = self.commits.get(&id) {
                queue.extend(info.parents.iter().cloned());
            }
        }
        false
    }

    fn apply_changes(
        &self,
        base_tree: &Oid,
        changes: &[TreeChange],
    ) -> Result<BTreeMap<String, MockEntry>, ForgeError> {
        let mut entries = self
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| rejected(format!("base_tree {} is not a valid tree", base_tree)))?;

        let mut seen = HashSet::new();
        for change in changes {
            let path = change.path.as_str();
            if !seen.insert(path) {
                return Err(rejected(format!("duplicate path '{}' in tree", path)));
            }
            match &change.content {
                Some(blob) => {
                    if !self.blobs.contains_key(blob) {
                        return Err(rejected(format!("blob {} does not exist", blob)));
                    }
                    entries.insert(
                        path.to_string(),
                        MockEntry {
                            mode: change.mode,
                            blob: blob.clone(),
                        },
                    );
                }
                None => {
                    if entries.remove(path).is_none() {
                        return Err(rejected(format!(
                            "cannot delete '{}': not in base tree",
                            path
                        )));
                    }
                }
            }
        }

        for change in changes.iter().filter(|c| c.content.is_some()) {
            if let Some(dir) = change.path.ancestors().find(|dir| entries.contains_key(*dir)) {
                return Err(rejected(format!("'{}' is both a file and a directory", dir)));
            }
            let below = format!("{}/", change.path);
            if entries.keys().any(|path| path.starts_with(&below)) {
                return Err(rejected(format!(
                    "'{}' is both a file and a directory",
                    change.path
                )));
            }
        }

        Ok(entries)
    }
}

impl MockDatabase {
    /// Create a new empty mock database.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockDatabaseInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use taxamend::forge::mock::{FailOn, MockDatabase};
    /// use taxamend::forge::ForgeError;
    ///
    /// let db = MockDatabase::new().fail_on(FailOn::CreateTree(ForgeError::ApiError {
    ///     status: 502,
    ///     message: "bad gateway".into(),
    /// }));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Delay every call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = Some(latency);
        self
    }

    /// Move `branch` to `to` when the next commit is written, as if another
    /// writer pushed while an amend was in flight.
    pub fn simulate_concurrent_push(&self, branch: &BranchName, to: &Oid) {
        self.state().concurrent_push = Some((branch.clone(), to.clone()));
    }

    /// Write blobs, a flat tree and a commit for `files`, returning the commit id.
    ///
    /// Paths are stored as given.
    pub fn seed_commit(&self, files: &[(&str, &[u8])], parents: &[Oid], message: &str) -> Oid {
        let mut state = self.state();
        let mut entries = BTreeMap::new();
        for (path, content) in files {
            let blob = blob_id(content);
            state.blobs.insert(blob.clone(), content.to_vec());
            entries.insert(
                path.to_string(),
                MockEntry {
                    mode: FileMode::Regular,
                    blob,
                },
            );
        }
        let tree = state.store_tree(entries);
        let id = commit_id(&tree, parents, None, message);
        state.commits.insert(
            id.clone(),
            CommitInfo {
                id: id.clone(),
                tree,
                parents: parents.to_vec(),
                message: message.to_string(),
                author: None,
            },
        );
        id
    }

    /// Point `branch` at `commit` directly.
    pub fn set_ref(&self, branch: &BranchName, commit: &Oid) {
        self.state().refs.insert(branch.clone(), commit.clone());
    }

    /// Current target of `branch`.
    pub fn ref_target(&self, branch: &BranchName) -> Option<Oid> {
        self.state().refs.get(branch).cloned()
    }

    /// A stored commit.
    pub fn commit(&self, id: &Oid) -> Option<CommitInfo> {
        self.state().commits.get(id).cloned()
    }

    /// Entries of a stored tree, keyed by path.
    pub fn tree_entries(&self, id: &Oid) -> Option<BTreeMap<String, MockEntry>> {
        self.state().trees.get(id).cloned()
    }

    /// Content of a stored blob.
    pub fn blob(&self, id: &Oid) -> Option<Vec<u8>> {
        self.state().blobs.get(id).cloned()
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Largest number of blob writes observed in flight at once.
    pub fn max_concurrent_blob_writes(&self) -> usize {
        self.state().max_blob_writes_in_flight
    }

    /// Record an operation and report the injected failure, if any.
    fn begin(&self, op: MockOperation, name: &str) -> Result<Option<Duration>, ForgeError> {
        let mut state = self.state();
        state.operations.push(op);
        state.check_fail(name)?;
        Ok(state.latency)
    }

    async fn pause(latency: Option<Duration>) {
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl GitDatabase for MockDatabase {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn resolve_ref(&self, branch: &BranchName) -> Result<Oid, ForgeError> {
        let latency = self.begin(
            MockOperation::ResolveRef {
                branch: branch.clone(),
            },
            "resolve_ref",
        )?;
        Self::pause(latency).await;

        self.ref_target(branch)
            .ok_or_else(|| ForgeError::NotFound(format!("ref {}", branch.ref_name())))
    }

    async fn get_commit(&self, id: &Oid) -> Result<CommitInfo, ForgeError> {
        let latency = self.begin(MockOperation::GetCommit { id: id.clone() }, "get_commit")?;
        Self::pause(latency).await;

        self.commit(id)
            .ok_or_else(|| ForgeError::NotFound(format!("commit {}", id)))
    }

    async fn create_blob(&self, content: &[u8]) -> Result<Oid, ForgeError> {
        let latency = self.begin(
            MockOperation::CreateBlob { len: content.len() },
            "create_blob",
        )?;

        {
            let mut state = self.state();
            state.blob_writes_in_flight += 1;
            state.max_blob_writes_in_flight = state
                .max_blob_writes_in_flight
                .max(state.blob_writes_in_flight);
        }
        Self::pause(latency).await;

        let id = blob_id(content);
        let mut state = self.state();
        state.blob_writes_in_flight -= 1;
        state.blobs.insert(id.clone(), content.to_vec());
        Ok(id)
    }

    async fn create_tree(&self, request: CreateTreeRequest) -> Result<Oid, ForgeError> {
        let latency = self.begin(
            MockOperation::CreateTree {
                base_tree: request.base_tree.clone(),
                changes: request.changes.clone(),
            },
            "create_tree",
        )?;
        Self::pause(latency).await;

        let mut state = self.state();
        let entries = state.apply_changes(&request.base_tree, &request.changes)?;
        Ok(state.store_tree(entries))
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Oid, ForgeError> {
        let latency = self.begin(
            MockOperation::CreateCommit {
                tree: request.tree.clone(),
                parents: request.parents.clone(),
                message: request.message.clone(),
            },
            "create_commit",
        )?;
        Self::pause(latency).await;

        let mut state = self.state();
        if !state.trees.contains_key(&request.tree) {
            return Err(rejected(format!("tree {} does not exist", request.tree)));
        }
        if let Some(missing) = request
            .parents
            .iter()
            .find(|p| !state.commits.contains_key(*p))
        {
            return Err(rejected(format!("parent {} does not exist", missing)));
        }

        let id = commit_id(
            &request.tree,
            &request.parents,
            request.author.as_ref(),
            &request.message,
        );
        state.commits.insert(
            id.clone(),
            CommitInfo {
                id: id.clone(),
                tree: request.tree,
                parents: request.parents,
                message: request.message,
                author: request.author,
            },
        );

        if let Some((branch, to)) = state.concurrent_push.take() {
            state.refs.insert(branch, to);
        }
        Ok(id)
    }

    async fn update_ref(&self, request: UpdateRefRequest) -> Result<(), ForgeError> {
        let latency = self.begin(
            MockOperation::UpdateRef {
                branch: request.branch.clone(),
                target: request.target.clone(),
                expected: request.expected.clone(),
                force: request.force,
            },
            "update_ref",
        )?;
        Self::pause(latency).await;

        let mut state = self.state();
        let current = state
            .refs
            .get(&request.branch)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("ref {}", request.branch.ref_name())))?;

        if !state.commits.contains_key(&request.target) {
            return Err(rejected(format!("object {} does not exist", request.target)));
        }
        if let Some(expected) = &request.expected {
            if &current != expected {
                return Err(ForgeError::Conflict(format!(
                    "{} is at {}, expected {}",
                    request.branch,
                    current.short(7),
                    expected.short(7)
                )));
            }
        }
        if !request.force && !state.is_descendant(&request.target, &current) {
            return Err(rejected("Update is not a fast forward"));
        }

        state.refs.insert(request.branch, request.target);

        if let Some(FailOn::UpdateRefAfterWrite(e)) = &state.fail_on {
            return Err(e.clone());
        }
        Ok(())
    }
}
