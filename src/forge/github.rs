//! forge::github
//!
//! GitHub implementation of [`GitDatabase`] over the REST `git/*` endpoints.
//!
//! # Design
//!
//! Each trait method is one request:
//! - `GET  git/refs/heads/{branch}`
//! - `GET  git/commits/{sha}`
//! - `POST git/blobs` (base64 content)
//! - `POST git/trees` (`base_tree` plus changed entries, `sha: null` deletes)
//! - `POST git/commits`
//! - `PATCH git/refs/heads/{branch}`
//!
//! Responses are deserialized into private structs and converted into the
//! crate's typed records before returning; untyped JSON never leaves this
//! module.
//!
//! # Authentication
//!
//! A [`TokenProvider`] is asked for a token before every request. A 401/403
//! is reported as-is; nothing is retried.
//!
//! # Ref URLs
//!
//! Branch names may contain `#`, `%` or `?`, so each `/`-separated component
//! is percent-encoded as its own path segment.
//!
//! # Ref preconditions
//!
//! The GitHub refs API has no compare-and-swap. When an update carries an
//! expected previous commit, the ref is re-read immediately before the
//! PATCH and the update is refused with [`ForgeError::Conflict`] on mismatch.
//! This narrows the lost-update window to a single round trip.
//!
//! # Example
//!
//! ```ignore
//! use taxamend::auth::StaticTokenProvider;
//! use taxamend::forge::github::GitHubDatabase;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(StaticTokenProvider::from_env("GITHUB_TOKEN")?);
//! let db = GitHubDatabase::new(provider, "octocat", "taxonomy");
//! let head = db.resolve_ref(&BranchName::new("contrib-123")?).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{
    CommitInfo, CreateCommitRequest, CreateTreeRequest, ForgeError, GitDatabase, UpdateRefRequest,
};
use crate::auth::TokenProvider;
use crate::core::types::{BranchName, Oid, Signature};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("taxamend/", env!("CARGO_PKG_VERSION"));

/// Resolved connection settings for [`GitHubDatabase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeSettings {
    /// API base URL (configurable for GitHub Enterprise)
    pub api_base: String,
    /// Owner of the repository holding the branches
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// GitHub git-database client.
pub struct GitHubDatabase {
    /// HTTP client for making requests
    client: Client,
    /// Source of bearer tokens
    token_provider: Arc<dyn TokenProvider>,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL
    api_base: String,
}

// Custom Debug to keep the provider (and its token) out of output
impl std::fmt::Debug for GitHubDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubDatabase")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubDatabase {
    /// Create a client for `owner/repo` on github.com with no request timeout.
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token_provider: provider,
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Create a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::NetworkError` if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn from_settings(
        settings: &ForgeSettings,
        provider: Arc<dyn TokenProvider>,
    ) -> Result<Self, ForgeError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ForgeError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_provider: provider,
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Use a different API base URL (GitHub Enterprise, test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build common headers for API requests (async to allow token refresh).
    async fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let token = self
            .token_provider
            .bearer_token()
            .await
            .map_err(|e| ForgeError::AuthFailed(e.to_string()))?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(USER_AGENT_VALUE),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Send one request and decode the response.
    async fn execute<B, T>(&self, method: Method, url: &str, body: Option<&B>) -> Result<T, ForgeError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        debug!(%method, url, "github request");
        let mut request = self
            .client
            .request(method, url)
            .headers(self.headers().await?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        Self::handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ForgeError::InvalidResponse(format!("failed to parse response: {}", e)))
        } else {
            Err(Self::error_from_response(response, status).await)
        }
    }

    /// Map an error response from the API.
    async fn error_from_response(response: Response, status: StatusCode) -> ForgeError {
        // Read headers before the body consumes the response.
        let headers = response.headers();
        let rate_limit_exhausted = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");
        let required_permissions = headers
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limit_exhausted => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);
                if let Some(perms) = required_permissions {
                    err_msg.push_str(&format!(" [required: {}]", perms));
                }
                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::CONFLICT => ForgeError::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }

    fn ref_url(&self, branch: &BranchName) -> Result<String, ForgeError> {
        let base = self.repo_url("git/refs/heads");
        let mut url = Url::parse(&base)
            .map_err(|e| ForgeError::NetworkError(format!("invalid API URL '{base}': {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ForgeError::NetworkError(format!("invalid API URL '{base}'")))?
            .extend(branch.as_str().split('/'));
        Ok(url.into())
    }
}

/// Map a reqwest transport failure (no HTTP status available).
fn transport_error(e: reqwest::Error) -> ForgeError {
    if e.is_timeout() {
        ForgeError::NetworkError(format!("request timed out: {}", e))
    } else {
        ForgeError::NetworkError(e.to_string())
    }
}

fn parse_oid(sha: String, what: &str) -> Result<Oid, ForgeError> {
    Oid::new(sha).map_err(|e| ForgeError::InvalidResponse(format!("{what}: {e}")))
}

#[async_trait]
impl GitDatabase for GitHubDatabase {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn resolve_ref(&self, branch: &BranchName) -> Result<Oid, ForgeError> {
        let lookup: RefLookup = self
            .execute::<(), _>(Method::GET, &self.ref_url(branch)?, None)
            .await?;

        // Without an exact match GitHub lists every ref sharing the prefix.
        let wanted = branch.ref_name();
        let found = match lookup {
            RefLookup::Exact(r) => Some(r).filter(|r| r.ref_name == wanted),
            RefLookup::Matches(refs) => refs.into_iter().find(|r| r.ref_name == wanted),
        };
        let found = found.ok_or_else(|| ForgeError::NotFound(format!("ref {}", wanted)))?;

        if found.object.kind != "commit" {
            return Err(ForgeError::InvalidResponse(format!(
                "{} points at a {}, not a commit",
                wanted, found.object.kind
            )));
        }
        parse_oid(found.object.sha, "ref target")
    }

    async fn get_commit(&self, id: &Oid) -> Result<CommitInfo, ForgeError> {
        let url = self.repo_url(&format!("git/commits/{}", id));
        let commit: GitHubCommit = self.execute::<(), _>(Method::GET, &url, None).await?;
        commit.try_into()
    }

    async fn create_blob(&self, content: &[u8]) -> Result<Oid, ForgeError> {
        let body = CreateBlobBody {
            content: base64::engine::general_purpose::STANDARD.encode(content),
            encoding: "base64",
        };
        let created: GitHubSha = self
            .execute(Method::POST, &self.repo_url("git/blobs"), Some(&body))
            .await?;
        parse_oid(created.sha, "blob sha")
    }

    async fn create_tree(&self, request: CreateTreeRequest) -> Result<Oid, ForgeError> {
        let body = CreateTreeBody {
            base_tree: request.base_tree.as_str(),
            tree: request
                .changes
                .iter()
                .map(|change| TreeEntryBody {
                    path: change.path.as_str(),
                    mode: change.mode.as_str(),
                    kind: "blob",
                    sha: change.content.as_ref().map(|oid| oid.as_str()),
                })
                .collect(),
        };
        let created: GitHubSha = self
            .execute(Method::POST, &self.repo_url("git/trees"), Some(&body))
            .await?;
        parse_oid(created.sha, "tree sha")
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Oid, ForgeError> {
        let body = CreateCommitBody {
            message: &request.message,
            tree: request.tree.as_str(),
            parents: request.parents.iter().map(|p| p.as_str()).collect(),
            author: request.author.as_ref().map(|a| PersonBody {
                name: &a.name,
                email: &a.email,
            }),
        };
        let created: GitHubSha = self
            .execute(Method::POST, &self.repo_url("git/commits"), Some(&body))
            .await?;
        parse_oid(created.sha, "commit sha")
    }

    async fn update_ref(&self, request: UpdateRefRequest) -> Result<(), ForgeError> {
        if let Some(expected) = &request.expected {
            let current = self.resolve_ref(&request.branch).await?;
            if &current != expected {
                return Err(ForgeError::Conflict(format!(
                    "{} is at {}, expected {}",
                    request.branch,
                    current.short(7),
                    expected.short(7)
                )));
            }
        }

        let body = UpdateRefBody {
            sha: request.target.as_str(),
            force: request.force,
        };
        let _: GitHubRef = self
            .execute(Method::PATCH, &self.ref_url(&request.branch)?, Some(&body))
            .await?;
        Ok(())
    }
}

// --------------------------------------------------------------------------
// Request and response bodies
// --------------------------------------------------------------------------

/// Request body for creating a blob.
#[derive(Serialize)]
struct CreateBlobBody {
    content: String,
    encoding: &'static str,
}

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: Vec<TreeEntryBody<'a>>,
}

/// One tree entry; `sha: null` removes the path from the base tree.
#[derive(Serialize)]
struct TreeEntryBody<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    sha: Option<&'a str>,
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<PersonBody<'a>>,
}

#[derive(Serialize)]
struct PersonBody<'a> {
    name: &'a str,
    email: &'a str,
}

/// Request body for moving a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Any response that only matters for its `sha`.
#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

/// A ref lookup answers with one ref, or with all prefix matches.
#[derive(Deserialize)]
#[serde(untagged)]
enum RefLookup {
    Exact(GitHubRef),
    Matches(Vec<GitHubRef>),
}

#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
    object: GitHubObject,
}

#[derive(Deserialize)]
struct GitHubObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

/// GitHub git commit format.
#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    tree: GitHubSha,
    parents: Vec<GitHubSha>,
    message: String,
    author: Option<GitHubPerson>,
}

#[derive(Deserialize)]
struct GitHubPerson {
    name: String,
    email: String,
}

impl TryFrom<GitHubCommit> for CommitInfo {
    type Error = ForgeError;

    fn try_from(commit: GitHubCommit) -> Result<Self, Self::Error> {
        Ok(CommitInfo {
            id: parse_oid(commit.sha, "commit sha")?,
            tree: parse_oid(commit.tree.sha, "commit tree")?,
            parents: commit
                .parents
                .into_iter()
                .map(|p| parse_oid(p.sha, "commit parent"))
                .collect::<Result<_, _>>()?,
            message: commit.message,
            author: commit.author.map(|a| Signature::new(a.name, a.email)),
        })
    }
}
