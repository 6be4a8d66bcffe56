//! auth::provider
//!
//! Token providers that hand out a pre-acquired bearer token.
//!
//! Token acquisition (OAuth flows, session handling) happens outside this
//! crate. By the time an amend runs the token is already known, so the
//! provider only has to return it.

use async_trait::async_trait;

use super::{AuthError, TokenProvider};

/// A provider holding a single bearer token for its whole lifetime.
///
/// # Example
///
/// ```
/// use taxamend::auth::{StaticTokenProvider, TokenProvider};
///
/// let provider = StaticTokenProvider::new("ghp_example").unwrap();
/// assert!(provider.is_authenticated());
/// // Debug output never includes the token
/// assert!(!format!("{:?}", provider).contains("ghp_example"));
/// ```
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[redacted]")
            .finish()
    }
}

impl StaticTokenProvider {
    /// Wrap a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is blank or contains
    /// characters that cannot appear in an HTTP header.
    pub fn new(token: impl Into<String>) -> Result<Self, AuthError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(AuthError::InvalidToken("token is empty".into()));
        }
        if !token.chars().all(|c| c.is_ascii_graphic()) {
            return Err(AuthError::InvalidToken(
                "token contains whitespace or non-ASCII characters".into(),
            ));
        }
        Ok(Self { token })
    }

    /// Read the token once from the environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, AuthError> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Self::new(token),
            _ => Err(AuthError::MissingToken(var.to_string())),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}
