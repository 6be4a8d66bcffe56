//! amend::tree
//!
//! Planning the tree write for an amend.
//!
//! The new tree is expressed relative to the head's tree: every replaced
//! file is upserted at its new path, and every file that moved is deleted
//! at its old path. Everything else is carried through by `base_tree`.
//!
//! Planning is pure so that the entry set can be checked before anything
//! is written.
//!
//! Every upsert carries the builder's mode, including in-place replacements.
//! The head's entry modes are not read, so replacing an executable or a
//! symlink with the default builder leaves a regular file. Contribution
//! files are always regular.

use std::collections::HashSet;

use super::error::AmendError;
use crate::core::types::{FileMode, Oid, RepoPath};
use crate::forge::{CreateTreeRequest, TreeChange};

/// One file's move within the tree, with its already-written blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChange {
    /// Where the file lived before, if it existed
    pub old_path: Option<RepoPath>,
    /// Where the file lives after the amend
    pub new_path: RepoPath,
    /// Blob holding the new content
    pub content: Oid,
}

impl PathChange {
    /// Whether the file leaves its old path.
    pub fn is_rename(&self) -> bool {
        self.old_path
            .as_ref()
            .is_some_and(|old| old != &self.new_path)
    }
}

/// Plans tree writes with a fixed entry mode for every written path.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBuilder {
    mode: FileMode,
}

impl TreeBuilder {
    pub fn new(mode: FileMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Compute the tree entries for `changes`.
    ///
    /// Upserts come first in request order, followed by deletions of vacated
    /// old paths in request order. A vacated path that another change writes
    /// to is not deleted, so swapping two files yields two upserts only.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when `changes` is empty or names a target path twice.
    pub fn plan(&self, changes: &[PathChange]) -> Result<Vec<TreeChange>, AmendError> {
        if changes.is_empty() {
            return Err(AmendError::InvalidRequest("no files to write".into()));
        }

        let mut targets = HashSet::new();
        for change in changes {
            if !targets.insert(change.new_path.as_str()) {
                return Err(AmendError::InvalidRequest(format!(
                    "path '{}' is written more than once",
                    change.new_path
                )));
            }
        }

        let mut entries: Vec<TreeChange> = changes
            .iter()
            .map(|c| TreeChange::upsert(c.new_path.clone(), self.mode, c.content.clone()))
            .collect();

        let mut deleted = HashSet::new();
        for change in changes.iter().filter(|c| c.is_rename()) {
            if let Some(old) = &change.old_path {
                if !targets.contains(old.as_str()) && deleted.insert(old.as_str()) {
                    entries.push(TreeChange::delete(old.clone(), self.mode));
                }
            }
        }

        Ok(entries)
    }

    /// Plan `changes` as a tree write on top of `base_tree`.
    pub fn request(
        &self,
        base_tree: &Oid,
        changes: &[PathChange],
    ) -> Result<CreateTreeRequest, AmendError> {
        Ok(CreateTreeRequest {
            base_tree: base_tree.clone(),
            changes: self.plan(changes)?,
        })
    }
}
