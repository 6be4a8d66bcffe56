//! Integration tests for the amend pipeline.
//!
//! These tests run complete amends against `MockDatabase`, which stores
//! objects content-addressed and enforces ref preconditions, so the
//! resulting trees, commits and refs can be inspected directly.

use std::sync::Arc;
use std::time::Duration;

use taxamend::amend::{
    AmendError, AmendRequest, AmendSettings, AmendState, Amender, FileReplacement,
};
use taxamend::core::contribution::{
    signed_off_message, ContributionFiles, ContributionKind, DEFAULT_AMEND_SUMMARY,
};
use taxamend::core::types::{BranchName, FileMode, Oid, RepoPath, Signature};
use taxamend::forge::mock::{blob_id, FailOn, MockDatabase, MockOperation};
use taxamend::forge::ForgeError;

const QNA: &str = "knowledge/science/physics/qna.yaml";
const ATTRIBUTION: &str = "knowledge/science/physics/attribution.txt";
const SIBLING: &str = "knowledge/science/physics/notes.md";

struct Fixture {
    db: MockDatabase,
    branch: BranchName,
    parent: Oid,
    head: Oid,
}

/// Branch `contrib-123` with one contribution commit on top of a base commit.
fn fixture() -> Fixture {
    let db = MockDatabase::new();
    let parent = db.seed_commit(
        &[("README.md", b"taxonomy"), ("knowledge/other/qna.yaml", b"other")],
        &[],
        "base",
    );
    let head = db.seed_commit(
        &[
            ("README.md", b"taxonomy"),
            ("knowledge/other/qna.yaml", b"other"),
            (QNA, b"version: 3\nquestion: v1\n"),
            (ATTRIBUTION, b"Title: v1\n"),
            (SIBLING, b"notes"),
        ],
        &[parent.clone()],
        "Add physics knowledge",
    );
    let branch = BranchName::new("contrib-123").unwrap();
    db.set_ref(&branch, &head);
    Fixture {
        db,
        branch,
        parent,
        head,
    }
}

fn path(p: &str) -> RepoPath {
    RepoPath::new(p).unwrap()
}

fn amender(db: &MockDatabase) -> Amender {
    Amender::new(Arc::new(db.clone()), AmendSettings::default())
}

fn signer() -> Signature {
    Signature::new("Ada Lovelace", "ada@example.com")
}

fn edit_request(fx: &Fixture, document: &[u8], attribution: &[u8]) -> AmendRequest {
    let files = ContributionFiles::new(ContributionKind::Knowledge, "science/physics").unwrap();
    AmendRequest::new(
        fx.branch.clone(),
        signed_off_message(DEFAULT_AMEND_SUMMARY, &signer()),
    )
    .files(files.replacements(&files, document.to_vec(), attribution.to_vec()))
    .author(signer())
}

fn ran(db: &MockDatabase, pred: impl Fn(&MockOperation) -> bool) -> bool {
    db.operations().iter().any(pred)
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn in_place_edit_moves_branch_to_sibling_commit() {
        let fx = fixture();
        let outcome = amender(&fx.db)
            .amend(edit_request(&fx, b"version: 3\nquestion: v2\n", b"Title: v2\n"))
            .await
            .unwrap();

        assert_eq!(outcome.previous_head, fx.head);
        assert_eq!(fx.db.ref_target(&fx.branch), Some(outcome.commit.clone()));

        let commit = fx.db.commit(&outcome.commit).unwrap();
        assert_eq!(commit.parents, vec![fx.parent.clone()]);
        assert_eq!(outcome.parents, vec![fx.parent.clone()]);
        assert_eq!(commit.tree, outcome.tree);
        assert_eq!(
            commit.message,
            "Amend commit with updated content\n\nSigned-off-by: Ada Lovelace <ada@example.com>"
        );
        assert_eq!(commit.author, Some(signer()));

        let entries = fx.db.tree_entries(&outcome.tree).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[QNA].blob, blob_id(b"version: 3\nquestion: v2\n"));
        assert_eq!(entries[ATTRIBUTION].blob, blob_id(b"Title: v2\n"));
        assert_eq!(
            fx.db.blob(&entries[QNA].blob).unwrap(),
            b"version: 3\nquestion: v2\n"
        );

        let roles: Vec<_> = outcome.blobs.iter().map(|b| b.role.as_str()).collect();
        assert_eq!(roles, vec!["document", "attribution"]);
    }

    #[tokio::test]
    async fn in_place_edit_preserves_untouched_entries() {
        let fx = fixture();
        let old_tree = fx.db.commit(&fx.head).unwrap().tree;
        let before = fx.db.tree_entries(&old_tree).unwrap();

        let outcome = amender(&fx.db)
            .amend(edit_request(&fx, b"new", b"new attribution"))
            .await
            .unwrap();
        let after = fx.db.tree_entries(&outcome.tree).unwrap();

        for untouched in [SIBLING, "README.md", "knowledge/other/qna.yaml"] {
            assert_eq!(after[untouched], before[untouched], "{untouched} changed");
        }
    }

    #[tokio::test]
    async fn replaced_files_take_the_configured_mode() {
        let fx = fixture();
        let settings = AmendSettings {
            file_mode: FileMode::Executable,
            ..AmendSettings::default()
        };

        let outcome = Amender::new(Arc::new(fx.db.clone()), settings)
            .amend(edit_request(&fx, b"new", b"new attribution"))
            .await
            .unwrap();
        let after = fx.db.tree_entries(&outcome.tree).unwrap();

        assert_eq!(after[QNA].mode, FileMode::Executable);
        assert_eq!(after[ATTRIBUTION].mode, FileMode::Executable);
        assert_eq!(after[SIBLING].mode, FileMode::Regular);
    }

    #[tokio::test]
    async fn rename_removes_old_directory() {
        let db = MockDatabase::new();
        let parent = db.seed_commit(&[("README.md", b"taxonomy")], &[], "base");
        let head = db.seed_commit(
            &[
                ("README.md", b"taxonomy"),
                ("knowledge/foo/qna.yaml", b"q1"),
                ("knowledge/foo/attribution.txt", b"a1"),
            ],
            &[parent.clone()],
            "Add foo",
        );
        let branch = BranchName::new("contrib-7").unwrap();
        db.set_ref(&branch, &head);

        let old = ContributionFiles::new(ContributionKind::Knowledge, "foo").unwrap();
        let new = ContributionFiles::new(ContributionKind::Knowledge, "bar").unwrap();
        let request = AmendRequest::new(branch.clone(), "Move foo to bar")
            .files(new.replacements(&old, b"q2".to_vec(), b"a2".to_vec()));

        let outcome = amender(&db).amend(request).await.unwrap();
        let entries = db.tree_entries(&outcome.tree).unwrap();

        assert!(entries.keys().all(|p| !p.starts_with("knowledge/foo/")));
        let bar: Vec<_> = entries
            .keys()
            .filter(|p| p.starts_with("knowledge/bar/"))
            .cloned()
            .collect();
        assert_eq!(
            bar,
            vec!["knowledge/bar/attribution.txt", "knowledge/bar/qna.yaml"]
        );
        assert_eq!(entries["knowledge/bar/qna.yaml"].blob, blob_id(b"q2"));
        assert_eq!(entries["knowledge/bar/attribution.txt"].blob, blob_id(b"a2"));
        assert!(entries.contains_key("README.md"));
        assert_eq!(db.commit(&outcome.commit).unwrap().parents, vec![parent]);
    }

    #[tokio::test]
    async fn swapping_two_files_deletes_nothing() {
        let fx = fixture();
        let request = AmendRequest::new(fx.branch.clone(), "swap")
            .file(FileReplacement::moved(
                "document",
                path(QNA),
                path(SIBLING),
                b"was qna".to_vec(),
            ))
            .file(FileReplacement::moved(
                "notes",
                path(SIBLING),
                path(QNA),
                b"was notes".to_vec(),
            ));

        let outcome = amender(&fx.db).amend(request).await.unwrap();

        let tree_write = fx
            .db
            .operations()
            .into_iter()
            .find_map(|op| match op {
                MockOperation::CreateTree { changes, .. } => Some(changes),
                _ => None,
            })
            .unwrap();
        assert!(tree_write.iter().all(|c| !c.is_delete()));

        let entries = fx.db.tree_entries(&outcome.tree).unwrap();
        assert_eq!(entries[SIBLING].blob, blob_id(b"was qna"));
        assert_eq!(entries[QNA].blob, blob_id(b"was notes"));
    }

    #[tokio::test]
    async fn repeated_amend_with_same_content_yields_same_tree() {
        let fx = fixture();
        let first = amender(&fx.db)
            .amend(edit_request(&fx, b"same", b"same attribution"))
            .await
            .unwrap();
        let second = amender(&fx.db)
            .amend(edit_request(&fx, b"same", b"same attribution"))
            .await
            .unwrap();

        assert_eq!(first.tree, second.tree);
        assert_eq!(second.previous_head, first.commit);
        assert_eq!(second.parents, vec![fx.parent.clone()]);
        assert_eq!(fx.db.ref_target(&fx.branch), Some(second.commit));
    }

    #[tokio::test]
    async fn amended_commit_is_never_a_child_of_old_head() {
        let fx = fixture();
        let outcome = amender(&fx.db)
            .amend(edit_request(&fx, b"x", b"y"))
            .await
            .unwrap();
        assert!(!outcome.parents.contains(&fx.head));
        assert_eq!(
            fx.db.commit(&outcome.commit).unwrap().parents,
            fx.db.commit(&fx.head).unwrap().parents
        );
    }

    #[tokio::test]
    async fn blob_writes_overlap() {
        let fx = fixture();
        let db = fx.db.clone().with_latency(Duration::from_millis(20));
        amender(&db)
            .amend(edit_request(&fx, b"a", b"b"))
            .await
            .unwrap();
        assert_eq!(db.max_concurrent_blob_writes(), 2);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn missing_branch_is_ref_not_found() {
        let fx = fixture();
        let mut request = edit_request(&fx, b"a", b"b");
        request.branch = BranchName::new("contrib-404").unwrap();

        let result = amender(&fx.db).amend(request).await;

        assert_eq!(
            result,
            Err(AmendError::RefNotFound(
                BranchName::new("contrib-404").unwrap()
            ))
        );
        assert_eq!(fx.db.operations().len(), 1);
    }

    #[tokio::test]
    async fn dangling_head_is_commit_not_found() {
        let fx = fixture();
        let dangling = Oid::new("d".repeat(40)).unwrap();
        fx.db.set_ref(&fx.branch, &dangling);

        let result = amender(&fx.db).amend(edit_request(&fx, b"a", b"b")).await;

        assert_eq!(result, Err(AmendError::CommitNotFound(dangling)));
        assert!(!ran(&fx.db, |op| matches!(op, MockOperation::CreateBlob { .. })));
    }

    #[tokio::test]
    async fn commit_write_failure_leaves_ref_untouched() {
        let fx = fixture();
        let err = ForgeError::ApiError {
            status: 422,
            message: "Tree SHA does not exist".into(),
        };
        let db = fx.db.clone().fail_on(FailOn::CreateCommit(err.clone()));

        let result = amender(&db).amend(edit_request(&fx, b"a", b"b")).await;

        assert_eq!(result, Err(AmendError::CommitWriteFailed(err)));
        assert!(!ran(&db, |op| matches!(op, MockOperation::UpdateRef { .. })));
        assert_eq!(db.ref_target(&fx.branch), Some(fx.head.clone()));
    }

    #[tokio::test]
    async fn server_error_on_tree_write_stops_pipeline() {
        let fx = fixture();
        let err = ForgeError::ApiError {
            status: 500,
            message: "GitHub server error: boom".into(),
        };
        let db = fx.db.clone().fail_on(FailOn::CreateTree(err.clone()));

        let result = amender(&db).amend(edit_request(&fx, b"a", b"b")).await;

        assert_eq!(result, Err(AmendError::TreeBuildFailed(err)));
        assert!(!ran(&db, |op| matches!(op, MockOperation::CreateCommit { .. })));
        assert!(!ran(&db, |op| matches!(op, MockOperation::UpdateRef { .. })));
        assert_eq!(db.ref_target(&fx.branch), Some(fx.head.clone()));
    }

    #[tokio::test]
    async fn rejected_credential_is_auth() {
        let fx = fixture();
        let db = fx
            .db
            .clone()
            .fail_on(FailOn::CreateBlob(ForgeError::AuthFailed("Bad credentials".into())));

        let result = amender(&db).amend(edit_request(&fx, b"a", b"b")).await;

        assert!(matches!(result, Err(AmendError::Auth(_))));
        assert_eq!(db.ref_target(&fx.branch), Some(fx.head.clone()));
    }

    #[tokio::test]
    async fn concurrent_push_is_a_conflict() {
        let fx = fixture();
        let pushed = fx
            .db
            .seed_commit(&[("README.md", b"someone else")], &[fx.head.clone()], "push");
        fx.db.simulate_concurrent_push(&fx.branch, &pushed);

        let mut states = Vec::new();
        let result = amender(&fx.db)
            .amend_with_progress(edit_request(&fx, b"a", b"b"), |s| states.push(s.clone()))
            .await;

        let expected = AmendError::Conflict {
            branch: fx.branch.clone(),
            expected: fx.head.clone(),
            actual: pushed.clone(),
        };
        assert_eq!(result, Err(expected.clone()));
        assert_eq!(fx.db.ref_target(&fx.branch), Some(pushed));
        assert!(!ran(&fx.db, |op| matches!(op, MockOperation::UpdateRef { .. })));
        assert_eq!(states.last(), Some(&AmendState::Failed(expected)));
    }

    #[tokio::test]
    async fn slow_remote_times_out_as_network_error() {
        let fx = fixture();
        let db = fx.db.clone().with_latency(Duration::from_millis(500));
        let settings = AmendSettings {
            call_timeout: Duration::from_millis(20),
            ..AmendSettings::default()
        };

        let result = Amender::new(Arc::new(db.clone()), settings)
            .amend(edit_request(&fx, b"a", b"b"))
            .await;

        match result {
            Err(AmendError::Network(msg)) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("expected network error, got {other:?}"),
        }
        assert_eq!(db.ref_target(&fx.branch), Some(fx.head.clone()));
    }

    #[tokio::test]
    async fn duplicate_targets_make_no_calls() {
        let fx = fixture();
        let request = AmendRequest::new(fx.branch.clone(), "dup")
            .file(FileReplacement::in_place("a", path(QNA), b"1".to_vec()))
            .file(FileReplacement::added("b", path(QNA), b"2".to_vec()));

        let result = amender(&fx.db).amend(request).await;

        assert!(matches!(result, Err(AmendError::InvalidRequest(_))));
        assert!(fx.db.operations().is_empty());
    }
}
