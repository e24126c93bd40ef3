//! Application configuration for tubekeeper.
//!
//! User config lives at `~/.tubekeeper/tubekeeper.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file, only the names of the env vars
//! that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TubekeeperError};
use crate::types::UpsertPolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tubekeeper.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tubekeeper";

// ---------------------------------------------------------------------------
// Config structs (matching tubekeeper.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// YouTube Data API settings.
    #[serde(default)]
    pub youtube: YouTubeConfig,

    /// Credential lookup.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Affiliate section markers and placement.
    #[serde(default)]
    pub section: SectionConfig,

    /// Snapshot backup settings.
    #[serde(default)]
    pub backup: BackupConfig,
}

/// `[youtube]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    /// Base URL of the Data API (overridable for tests and proxies).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[auth]` section.
///
/// An access token in `access_token_env` wins. Otherwise the refresh-token
/// grant is used with the client id/secret and refresh token read from the
/// named env vars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth2 token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Env var holding the OAuth client id.
    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,

    /// Env var holding the OAuth client secret.
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,

    /// Env var holding a long-lived refresh token.
    #[serde(default = "default_refresh_token_env")]
    pub refresh_token_env: String,

    /// Env var holding a ready-made access token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            client_id_env: default_client_id_env(),
            client_secret_env: default_client_secret_env(),
            refresh_token_env: default_refresh_token_env(),
            access_token_env: default_access_token_env(),
        }
    }
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".into()
}
fn default_client_id_env() -> String {
    "YOUTUBE_CLIENT_ID".into()
}
fn default_client_secret_env() -> String {
    "YOUTUBE_CLIENT_SECRET".into()
}
fn default_refresh_token_env() -> String {
    "YOUTUBE_REFRESH_TOKEN".into()
}
fn default_access_token_env() -> String {
    "YOUTUBE_ACCESS_TOKEN".into()
}

/// `[section]` section.
///
/// One marker pair is active per installation. Changing it after sections
/// were written leaves the old blocks unrecognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Literal line that opens the affiliate section.
    #[serde(default = "default_marker")]
    pub start_marker: String,

    /// Literal line that closes the affiliate section.
    #[serde(default = "default_marker")]
    pub end_marker: String,

    /// Placement policy when replacing an existing section.
    #[serde(default)]
    pub policy: UpsertPolicy,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            start_marker: default_marker(),
            end_marker: default_marker(),
            policy: UpsertPolicy::default(),
        }
    }
}

fn default_marker() -> String {
    "~~~~~~~~~~~~~~".into()
}

/// `[backup]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// SQLite database file for snapshots.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Note stored on every completed backup run.
    #[serde(default = "default_note")]
    pub note: String,

    /// Write a partial audit row when a run aborts.
    #[serde(default)]
    pub record_aborted_runs: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            note: default_note(),
            record_aborted_runs: false,
        }
    }
}

fn default_db_path() -> String {
    "~/.tubekeeper/youtube_backups.db".into()
}
fn default_note() -> String {
    "Full backup".into()
}

impl BackupConfig {
    /// Resolve `db_path`, expanding a leading `~/` to the home directory.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match self.db_path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir().ok_or_else(|| {
                    TubekeeperError::config("could not determine home directory")
                })?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.db_path)),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tubekeeper/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TubekeeperError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tubekeeper/tubekeeper.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TubekeeperError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TubekeeperError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| TubekeeperError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TubekeeperError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| TubekeeperError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

/// Check that some usable credential is present in the environment.
pub fn validate_credentials(config: &AppConfig) -> Result<()> {
    let auth = &config.auth;
    if env_is_set(&auth.access_token_env) {
        return Ok(());
    }

    let missing: Vec<&str> = [
        auth.client_id_env.as_str(),
        auth.client_secret_env.as_str(),
        auth.refresh_token_env.as_str(),
    ]
    .into_iter()
    .filter(|name| !env_is_set(name))
    .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(TubekeeperError::config(format!(
        "YouTube credentials not found. Set {} or all of: {}.",
        auth.access_token_env,
        missing.join(", ")
    )))
}

fn env_is_set(name: &str) -> bool {
    matches!(std::env::var(name), Ok(val) if !val.is_empty())
}
