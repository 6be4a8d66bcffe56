//! auth - bearer tokens for the forge API
//!
//! Every forge request carries a bearer credential. This module defines the
//! seam through which the forge client obtains it.
//!
//! # Components
//!
//! - [`TokenProvider`] - Trait for providing bearer tokens to forge adapters
//! - [`StaticTokenProvider`] - A token acquired elsewhere (env var, session)
//! - [`AuthError`] - Failures obtaining a token
//!
//! # Security
//!
//! Tokens MUST never appear in logs, error messages, or debug output.
//! All types in this module implement custom Debug to redact token values.

mod errors;
mod provider;

pub use errors::AuthError;
pub use provider::StaticTokenProvider;

/// Trait for providing bearer tokens to forge adapters.
///
/// The forge client asks for a token before every request. A rejected
/// token surfaces as an auth error; implementations that can refresh should
/// do it inside [`bearer_token`](TokenProvider::bearer_token) on the next call.
///
/// # Example
///
/// ```ignore
/// use taxamend::auth::TokenProvider;
///
/// async fn make_api_call(provider: &dyn TokenProvider) -> Result<()> {
///     let token = provider.bearer_token().await?;
///     // Use token in Authorization header
///     // ...
/// }
/// ```
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a valid bearer token.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if no usable token is available.
    async fn bearer_token(&self) -> Result<String, AuthError>;

    /// Check if authentication is available without contacting anything.
    fn is_authenticated(&self) -> bool;
}
