//! core::contribution
//!
//! Layout of taxonomy contributions inside the repository.
//!
//! A contribution is a directory under a kind-specific root holding two
//! files: the serialized record (`qna.yaml`, role `document`) and its
//! attribution text (`attribution.txt`, role `attribution`). Editing a
//! contribution may move it to a different directory, in which case both
//! files move together.

use crate::amend::FileReplacement;
use crate::core::types::{RepoPath, Signature, TypeError};

/// Role name of the serialized record file.
pub const DOCUMENT_ROLE: &str = "document";
/// Role name of the attribution file.
pub const ATTRIBUTION_ROLE: &str = "attribution";

/// Summary used when the caller supplies none.
pub const DEFAULT_AMEND_SUMMARY: &str = "Amend commit with updated content";

const DOCUMENT_FILE: &str = "qna.yaml";
const ATTRIBUTION_FILE: &str = "attribution.txt";

/// The two kinds of taxonomy contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionKind {
    Knowledge,
    Skill,
}

impl ContributionKind {
    /// Repository root for this kind, with a trailing slash.
    pub fn root(&self) -> &'static str {
        match self {
            ContributionKind::Knowledge => "knowledge/",
            ContributionKind::Skill => "compositional_skills/",
        }
    }
}

impl std::str::FromStr for ContributionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "knowledge" => Ok(ContributionKind::Knowledge),
            "skill" | "skills" => Ok(ContributionKind::Skill),
            other => Err(format!("unknown contribution kind '{other}'")),
        }
    }
}

/// Strip a leading `/` and ensure exactly one trailing `/`.
///
/// ```
/// use taxamend::core::contribution::normalize_dir;
///
/// assert_eq!(normalize_dir("/science/physics"), "science/physics/");
/// assert_eq!(normalize_dir("science/physics/"), "science/physics/");
/// ```
pub fn normalize_dir(dir: &str) -> String {
    let trimmed = dir.strip_prefix('/').unwrap_or(dir);
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Paths of the two files making up one contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionFiles {
    pub document: RepoPath,
    pub attribution: RepoPath,
}

impl ContributionFiles {
    /// Locate the contribution files for `dir` under the kind's root.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPath` if `dir` yields an invalid path
    /// (for example one containing `..`).
    pub fn new(kind: ContributionKind, dir: &str) -> Result<Self, TypeError> {
        let base = format!("{}{}", kind.root(), normalize_dir(dir));
        Ok(Self {
            document: RepoPath::new(format!("{base}{DOCUMENT_FILE}"))?,
            attribution: RepoPath::new(format!("{base}{ATTRIBUTION_FILE}"))?,
        })
    }

    /// Replacements that write new content at `self`, moving the files
    /// from `old` when it differs.
    pub fn replacements(
        &self,
        old: &ContributionFiles,
        document: Vec<u8>,
        attribution: Vec<u8>,
    ) -> Vec<FileReplacement> {
        vec![
            FileReplacement::moved(
                DOCUMENT_ROLE,
                old.document.clone(),
                self.document.clone(),
                document,
            ),
            FileReplacement::moved(
                ATTRIBUTION_ROLE,
                old.attribution.clone(),
                self.attribution.clone(),
                attribution,
            ),
        ]
    }
}

/// Commit message with a DCO sign-off trailer.
pub fn signed_off_message(summary: &str, signer: &Signature) -> String {
    format!("{summary}\n\nSigned-off-by: {signer}")
}

/// Web link of a pull request on the upstream repository.
pub fn pull_request_url(web_base: &str, owner: &str, repo: &str, number: u64) -> String {
    format!(
        "{}/{}/{}/pull/{}",
        web_base.trim_end_matches('/'),
        owner,
        repo,
        number
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_handles_slashes() {
        assert_eq!(normalize_dir("a/b"), "a/b/");
        assert_eq!(normalize_dir("/a/b"), "a/b/");
        assert_eq!(normalize_dir("a/b//"), "a/b/");
        assert_eq!(normalize_dir("/"), "");
        assert_eq!(normalize_dir(""), "");
    }

    #[test]
    fn knowledge_files() {
        let files = ContributionFiles::new(ContributionKind::Knowledge, "/science/physics").unwrap();
        assert_eq!(files.document.as_str(), "knowledge/science/physics/qna.yaml");
        assert_eq!(
            files.attribution.as_str(),
            "knowledge/science/physics/attribution.txt"
        );
    }

    #[test]
    fn skill_files() {
        let files = ContributionFiles::new(ContributionKind::Skill, "writing/poetry/").unwrap();
        assert_eq!(
            files.document.as_str(),
            "compositional_skills/writing/poetry/qna.yaml"
        );
    }

    #[test]
    fn rejects_escaping_dir() {
        assert!(ContributionFiles::new(ContributionKind::Knowledge, "../etc").is_err());
    }

    #[test]
    fn kind_parses() {
        assert_eq!(
            "knowledge".parse::<ContributionKind>(),
            Ok(ContributionKind::Knowledge)
        );
        assert_eq!(
            "skill".parse::<ContributionKind>(),
            Ok(ContributionKind::Skill)
        );
        assert!("other".parse::<ContributionKind>().is_err());
    }

    #[test]
    fn replacements_carry_roles_and_moves() {
        let old = ContributionFiles::new(ContributionKind::Knowledge, "foo").unwrap();
        let new = ContributionFiles::new(ContributionKind::Knowledge, "bar").unwrap();
        let reps = new.replacements(&old, b"doc".to_vec(), b"attr".to_vec());

        assert_eq!(reps.len(), 2);
        assert_eq!(reps[0].role, DOCUMENT_ROLE);
        assert_eq!(reps[0].old_path.as_ref(), Some(&old.document));
        assert_eq!(reps[0].new_path, new.document);
        assert_eq!(reps[0].content, b"doc");
        assert_eq!(reps[1].role, ATTRIBUTION_ROLE);
        assert_eq!(reps[1].new_path, new.attribution);
        assert!(reps.iter().all(|r| r.is_rename()));
    }

    #[test]
    fn same_dir_is_not_a_rename() {
        let files = ContributionFiles::new(ContributionKind::Knowledge, "foo").unwrap();
        let reps = files.replacements(&files, Vec::new(), Vec::new());
        assert!(reps.iter().all(|r| !r.is_rename()));
    }

    #[test]
    fn sign_off_trailer() {
        let msg = signed_off_message(
            DEFAULT_AMEND_SUMMARY,
            &Signature::new("Ada", "ada@example.com"),
        );
        assert_eq!(
            msg,
            "Amend commit with updated content\n\nSigned-off-by: Ada <ada@example.com>"
        );
    }

    #[test]
    fn pr_url() {
        assert_eq!(
            pull_request_url("https://github.com/", "instructlab", "taxonomy", 42),
            "https://github.com/instructlab/taxonomy/pull/42"
        );
    }
}
