//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Config File
//!
//! Located at (in order of precedence):
//! 1. `--config <path>`
//! 2. `$TAXAMEND_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/taxamend/config.toml`
//! 4. `~/.taxamend/config.toml`
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., the API base must be an http(s) URL).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::FileMode;

/// Top-level configuration file.
///
/// # Example
///
/// ```toml
/// [forge]
/// api_base = "https://api.github.com"
/// upstream_owner = "instructlab"
/// repo = "taxonomy"
/// fork_owner = "octocat"
///
/// [amend]
/// timeout_secs = 30
/// enforce_expected_head = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Forge connection settings
    pub forge: Option<ForgeConfig>,

    /// Amendment pipeline settings
    pub amend: Option<AmendConfig>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(forge) = &self.forge {
            forge.validate()?;
        }
        if let Some(amend) = &self.amend {
            amend.validate()?;
        }
        Ok(())
    }
}

/// Where the taxonomy repository lives and how to reach it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    /// REST API base URL (GitHub Enterprise: `https://host/api/v3`)
    pub api_base: Option<String>,

    /// Web base URL used for pull request links
    pub web_base: Option<String>,

    /// Owner of the upstream taxonomy repository (pull requests target it)
    pub upstream_owner: Option<String>,

    /// Repository name, shared by upstream and fork
    pub repo: Option<String>,

    /// Owner of the fork holding contribution branches
    pub fork_owner: Option<String>,

    /// Environment variable holding the bearer token
    pub token_env: Option<String>,
}

impl ForgeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("api_base", &self.api_base), ("web_base", &self.web_base)] {
            if let Some(url) = value {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ConfigError::InvalidValue(format!(
                        "forge.{key} must be an http(s) URL, got '{url}'"
                    )));
                }
            }
        }

        for (key, value) in [
            ("upstream_owner", &self.upstream_owner),
            ("repo", &self.repo),
            ("fork_owner", &self.fork_owner),
            ("token_env", &self.token_env),
        ] {
            if let Some(v) = value {
                if v.trim().is_empty() || v.contains('/') {
                    return Err(ConfigError::InvalidValue(format!(
                        "forge.{key} must be a non-empty name without '/'"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Amendment pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AmendConfig {
    /// Per-call network timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Fail with a conflict when the branch moved during the amend
    pub enforce_expected_head: Option<bool>,

    /// Mode for written blob entries
    pub file_mode: Option<FileMode>,
}

impl AmendConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "amend.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
