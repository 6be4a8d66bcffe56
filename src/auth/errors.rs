//! auth::errors
//!
//! Authentication error types.
//!
//! # Design
//!
//! Error messages MUST NOT contain tokens. Variants carry only the name of
//! where a token was expected, never the token itself.
//!
//! # Example
//!
//! ```
//! use taxamend::auth::AuthError;
//!
//! let err = AuthError::MissingToken("GITHUB_TOKEN".to_string());
//! assert!(err.to_string().contains("GITHUB_TOKEN"));
//! ```

use thiserror::Error;

/// Errors from authentication operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The environment variable expected to hold the token is unset.
    #[error("no token found: set the '{0}' environment variable")]
    MissingToken(String),

    /// A token was found but is unusable.
    #[error("invalid token: {0}")]
    InvalidToken(String),
}
