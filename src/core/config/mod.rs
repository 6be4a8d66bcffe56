//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Exactly one config file is read, the first found of:
//! 1. An explicit path (the `--config` flag)
//! 2. `$TAXAMEND_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/taxamend/config.toml`
//! 4. `~/.taxamend/config.toml`
//!
//! Values missing from the file fall back to built-in defaults. The
//! resolved values are handed to the forge client and the amender once,
//! at construction; nothing reads configuration mid-pipeline.
//!
//! # Example
//!
//! ```no_run
//! use taxamend::core::config::Config;
//!
//! let config = Config::load(None).unwrap().config;
//! println!("API: {}", config.api_base());
//! println!("Timeout: {:?}", config.amend_settings().call_timeout);
//! ```

pub mod schema;

pub use schema::{AmendConfig, FileConfig, ForgeConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::amend::AmendSettings;
use crate::core::types::FileMode;
use crate::forge::github::ForgeSettings;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TAXAMEND_CONFIG";

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_WEB_BASE: &str = "https://github.com";
const DEFAULT_UPSTREAM_OWNER: &str = "instructlab";
const DEFAULT_REPO: &str = "taxonomy";
const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Where it was loaded from (`None` when defaults are used).
    pub path: Option<PathBuf>,
}

/// Loaded configuration with default-applying accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: FileConfig,
}

impl Config {
    /// Wrap an already-parsed file config.
    pub fn new(file: FileConfig) -> Self {
        Self { file }
    }

    /// Load configuration, preferring `explicit` over the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing, or if any config
    /// file found cannot be parsed or fails validation. Missing files in the
    /// standard locations are not an error (defaults are used).
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_file(path)?;
            return Ok(ConfigLoadResult {
                config,
                path: Some(path.to_path_buf()),
            });
        }

        for path in Self::search_paths() {
            if path.exists() {
                let config = Self::load_file(&path)?;
                return Ok(ConfigLoadResult {
                    config,
                    path: Some(path),
                });
            }
        }

        Ok(ConfigLoadResult {
            config: Config::default(),
            path: None,
        })
    }

    /// Read, parse and validate a single config file.
    pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Config { file })
    }

    /// Candidate config locations, most specific first.
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("taxamend/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".taxamend/config.toml"));
        }
        paths
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    fn forge(&self) -> Option<&ForgeConfig> {
        self.file.forge.as_ref()
    }

    fn amend(&self) -> Option<&AmendConfig> {
        self.file.amend.as_ref()
    }

    /// REST API base URL, without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.forge()
            .and_then(|f| f.api_base.as_deref())
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    /// Web base URL for pull request links, without a trailing slash.
    pub fn web_base(&self) -> &str {
        self.forge()
            .and_then(|f| f.web_base.as_deref())
            .unwrap_or(DEFAULT_WEB_BASE)
            .trim_end_matches('/')
    }

    pub fn upstream_owner(&self) -> &str {
        self.forge()
            .and_then(|f| f.upstream_owner.as_deref())
            .unwrap_or(DEFAULT_UPSTREAM_OWNER)
    }

    pub fn repo(&self) -> &str {
        self.forge()
            .and_then(|f| f.repo.as_deref())
            .unwrap_or(DEFAULT_REPO)
    }

    /// Owner of the repository holding contribution branches.
    ///
    /// Defaults to the upstream owner when no fork is configured.
    pub fn fork_owner(&self) -> &str {
        self.forge()
            .and_then(|f| f.fork_owner.as_deref())
            .unwrap_or_else(|| self.upstream_owner())
    }

    pub fn token_env(&self) -> &str {
        self.forge()
            .and_then(|f| f.token_env.as_deref())
            .unwrap_or(DEFAULT_TOKEN_ENV)
    }

    /// Per-call network timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.amend()
                .and_then(|a| a.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Defaults to `true`.
    pub fn enforce_expected_head(&self) -> bool {
        self.amend()
            .and_then(|a| a.enforce_expected_head)
            .unwrap_or(true)
    }

    pub fn file_mode(&self) -> FileMode {
        self.amend().and_then(|a| a.file_mode).unwrap_or_default()
    }

    /// Resolved settings for the forge client.
    pub fn forge_settings(&self) -> ForgeSettings {
        ForgeSettings {
            api_base: self.api_base().to_string(),
            owner: self.fork_owner().to_string(),
            repo: self.repo().to_string(),
            timeout: self.timeout(),
        }
    }

    /// Resolved settings for the amendment pipeline.
    pub fn amend_settings(&self) -> AmendSettings {
        AmendSettings {
            call_timeout: self.timeout(),
            enforce_expected_head: self.enforce_expected_head(),
            file_mode: self.file_mode(),
        }
    }

    /// The configuration with every default filled in.
    pub fn effective(&self) -> FileConfig {
        FileConfig {
            forge: Some(ForgeConfig {
                api_base: Some(self.api_base().to_string()),
                web_base: Some(self.web_base().to_string()),
                upstream_owner: Some(self.upstream_owner().to_string()),
                repo: Some(self.repo().to_string()),
                fork_owner: Some(self.fork_owner().to_string()),
                token_env: Some(self.token_env().to_string()),
            }),
            amend: Some(AmendConfig {
                timeout_secs: Some(self.timeout().as_secs()),
                enforce_expected_head: Some(self.enforce_expected_head()),
                file_mode: Some(self.file_mode()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.api_base(), "https://api.github.com");
        assert_eq!(config.web_base(), "https://github.com");
        assert_eq!(config.upstream_owner(), "instructlab");
        assert_eq!(config.repo(), "taxonomy");
        assert_eq!(config.fork_owner(), "instructlab");
        assert_eq!(config.token_env(), "GITHUB_TOKEN");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.enforce_expected_head());
        assert_eq!(config.file_mode(), FileMode::Regular);
    }

    #[test]
    fn explicit_path_is_loaded() {
        let file = write_config(
            "[forge]\nfork_owner = \"octocat\"\napi_base = \"http://127.0.0.1:9/\"\n\n[amend]\ntimeout_secs = 3\n",
        );
        let result = Config::load(Some(file.path())).unwrap();
        assert_eq!(result.path.as_deref(), Some(file.path()));

        let config = result.config;
        assert_eq!(config.fork_owner(), "octocat");
        assert_eq!(config.upstream_owner(), "instructlab");
        assert_eq!(config.api_base(), "http://127.0.0.1:9");
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::ReadError { .. })
        ));
    }

    #[test]
    fn parse_error_names_the_file() {
        let file = write_config("[forge\n");
        match Config::load(Some(file.path())) {
            Err(ConfigError::ParseError { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn validation_runs_on_load() {
        let file = write_config("[amend]\ntimeout_secs = 0\n");
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn settings_are_resolved() {
        let file = write_config(
            "[forge]\nfork_owner = \"me\"\nrepo = \"tax\"\n\n[amend]\nenforce_expected_head = false\nfile_mode = \"100755\"\n",
        );
        let config = Config::load_file(file.path()).unwrap();

        let forge = config.forge_settings();
        assert_eq!(forge.owner, "me");
        assert_eq!(forge.repo, "tax");
        assert_eq!(forge.api_base, "https://api.github.com");

        let amend = config.amend_settings();
        assert!(!amend.enforce_expected_head);
        assert_eq!(amend.file_mode, FileMode::Executable);
        assert_eq!(amend.call_timeout, Duration::from_secs(30));
    }

    #[test]
    fn effective_round_trips_through_toml() {
        let config = Config::default();
        let rendered = toml::to_string_pretty(&config.effective()).unwrap();
        let reparsed: FileConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed, config.effective());
    }
}
