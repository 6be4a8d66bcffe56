//! Integration tests for the taxamend binary.
//!
//! These tests exercise the full CLI. Commands that reach the forge run
//! against a local `wiremock` server configured through `--config`.

use std::io::Write;

use assert_cmd::prelude::*;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_VAR: &str = "TAXAMEND_CLI_TEST_TOKEN";

/// Get a command for running taxamend.
fn taxamend() -> Command {
    let mut cmd = Command::cargo_bin("taxamend").unwrap();
    cmd.env_remove("TAXAMEND_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn config_for(api_base: &str) -> NamedTempFile {
    temp_file(&format!(
        r#"
[forge]
api_base = "{api_base}"
upstream_owner = "instructlab"
repo = "taxonomy"
fork_owner = "octocat"
token_env = "{TOKEN_VAR}"

[amend]
timeout_secs = 5
"#
    ))
}

fn sha(c: char) -> String {
    c.to_string().repeat(40)
}

#[test]
fn help_flag_works() {
    taxamend()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("amend"))
        .stdout(predicate::str::contains("head"));
}

#[test]
fn version_flag_works() {
    taxamend()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("taxamend"));
}

mod config {
    use super::*;

    #[test]
    fn prints_effective_configuration() {
        let config = config_for("https://ghe.example.com/api/v3");
        taxamend()
            .arg("--config")
            .arg(config.path())
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"api_base = "https://ghe.example.com/api/v3""#,
            ))
            .stdout(predicate::str::contains(r#"fork_owner = "octocat""#))
            .stdout(predicate::str::contains(r#"web_base = "https://github.com""#))
            .stdout(predicate::str::contains("timeout_secs = 5"))
            .stdout(predicate::str::contains("enforce_expected_head = true"))
            .stdout(predicate::str::contains(r#"file_mode = "100644""#));
    }

    #[test]
    fn rejects_unknown_keys() {
        let config = temp_file("[forge]\nowner = \"x\"\n");
        taxamend()
            .arg("--config")
            .arg(config.path())
            .arg("config")
            .assert()
            .failure()
            .stderr(predicate::str::starts_with("error:"))
            .stderr(predicate::str::contains("Failed to load config"));
    }

    #[test]
    fn missing_explicit_file_fails() {
        taxamend()
            .args(["--config", "/nonexistent/taxamend.toml", "config"])
            .assert()
            .failure();
    }
}

mod amend {
    use super::*;

    fn amend_cmd(
        branch: &str,
        config: &NamedTempFile,
        doc: &NamedTempFile,
        attr: &NamedTempFile,
    ) -> Command {
        let mut cmd = taxamend();
        cmd.arg("--config")
            .arg(config.path())
            .args(["amend", "--branch", branch, "--kind", "knowledge"])
            .args(["--path", "science/physics"])
            .arg("--document")
            .arg(doc.path())
            .arg("--attribution")
            .arg(attr.path())
            .args(["--name", "Ada Lovelace", "--email", "ada@example.com"]);
        cmd
    }

    #[test]
    fn missing_token_names_the_variable() {
        let config = config_for("https://api.github.com");
        let doc = temp_file("version: 3\n");
        let attr = temp_file("Title: x\n");

        amend_cmd("contrib-123", &config, &doc, &attr)
            .env_remove(TOKEN_VAR)
            .assert()
            .failure()
            .stderr(predicate::str::contains(TOKEN_VAR));
    }

    #[test]
    fn invalid_branch_fails_before_network() {
        let config = config_for("https://api.github.com");
        let doc = temp_file("d");
        let attr = temp_file("a");

        amend_cmd("bad..name", &config, &doc, &attr)
            .env(TOKEN_VAR, "ghp_test")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid branch name"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn amends_branch_and_prints_commit() {
        let server = MockServer::start().await;
        let ref_path = "/repos/octocat/taxonomy/git/refs/heads/contrib-123";
        let ref_body = |c: char| {
            json!({ "ref": "refs/heads/contrib-123", "object": { "sha": sha(c), "type": "commit" } })
        };

        Mock::given(method("GET"))
            .and(path(ref_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body('1')))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octocat/taxonomy/git/commits/{}", sha('1'))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('1'),
                "tree": { "sha": sha('7') },
                "parents": [{ "sha": sha('9') }],
                "message": "Add physics"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/taxonomy/git/blobs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": sha('b') })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/taxonomy/git/trees"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": sha('e') })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/taxonomy/git/commits"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": sha('f') })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(ref_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body('f')))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server.uri());
        let doc = temp_file("version: 3\n");
        let attr = temp_file("Title: x\n");
        let mut cmd = amend_cmd("contrib-123", &config, &doc, &attr);
        cmd.args(["--pr", "42"]).env(TOKEN_VAR, "ghp_test");

        let output = tokio::task::spawn_blocking(move || cmd.output())
            .await
            .unwrap()
            .unwrap();
        output
            .assert()
            .success()
            .stdout(predicate::str::contains(sha('f')))
            .stdout(predicate::str::contains(
                "https://github.com/instructlab/taxonomy/pull/42",
            ));
    }
}

mod head {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn prints_head_tree_and_parents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/taxonomy/git/refs/heads/contrib-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/contrib-123",
                "object": { "sha": sha('1'), "type": "commit" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octocat/taxonomy/git/commits/{}", sha('1'))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('1'),
                "tree": { "sha": sha('7') },
                "parents": [{ "sha": sha('9') }],
                "message": "Add physics\n\nSigned-off-by: Ada <ada@example.com>"
            })))
            .mount(&server)
            .await;

        let config = config_for(&server.uri());
        let mut cmd = taxamend();
        cmd.arg("--config")
            .arg(config.path())
            .args(["head", "contrib-123"])
            .env(TOKEN_VAR, "ghp_test");

        let output = tokio::task::spawn_blocking(move || cmd.output())
            .await
            .unwrap()
            .unwrap();
        output
            .assert()
            .success()
            .stdout(predicate::str::starts_with(sha('1')))
            .stdout(predicate::str::contains(format!("tree    {}", sha('7'))))
            .stdout(predicate::str::contains(format!("parent  {}", sha('9'))))
            .stdout(predicate::str::contains("Add physics"));
    }

    #[test]
    fn invalid_branch_prints_nothing_to_stdout() {
        taxamend()
            .args(["--quiet", "head", "bad..name"])
            .assert()
            .failure()
            .stdout(predicate::str::is_empty());
    }
}
