//! Application configuration for LinkForge.
//!
//! User config lives at `~/.linkforge/linkforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LinkForgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "linkforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".linkforge";

// ---------------------------------------------------------------------------
// Config structs (matching linkforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site identity and tracking path.
    #[serde(default)]
    pub site: SiteConfig,

    /// Document scanning patterns.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Per-network settings, keyed by network id (e.g. `[networks.amazon]`).
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkSettings>,

    /// Persistence backend selection.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site origin used to decide whether a link is external
    /// (e.g. `https://donkitchen.com`).
    #[serde(default)]
    pub origin: String,

    /// Path prefix for tracking redirects; the tracking URL is this prefix
    /// with the slug appended.
    #[serde(default = "default_tracking_base")]
    pub tracking_base: String,

    /// Content directory to scan, relative to the working directory.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: String::new(),
            tracking_base: default_tracking_base(),
            content_dir: default_content_dir(),
        }
    }
}

fn default_tracking_base() -> String {
    "/link/".into()
}
fn default_content_dir() -> String {
    "content".into()
}

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File include patterns, relative to the content dir. Empty means all
    /// markdown files.
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// File exclude patterns.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// One `[networks.<id>]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Whether conversion through this network is active. Detection still
    /// runs for disabled networks; only URL conversion is skipped.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Affiliate/tracking tag appended to converted URLs.
    #[serde(default)]
    pub tag: Option<String>,

    /// Strip known tracking query parameters when no product id can be
    /// extracted.
    #[serde(default = "default_true")]
    pub clean_params: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tag: None,
            clean_params: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selection: "file" or "remote".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Flat-file backend: path to the JSON link file.
    #[serde(default = "default_file_path")]
    pub file_path: String,

    /// Remote backend: base URL of the table store.
    #[serde(default)]
    pub remote_url: String,

    /// Remote backend: table name/identifier.
    #[serde(default)]
    pub remote_table: String,

    /// Name of the env var holding the API token (never store the token
    /// itself).
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            file_path: default_file_path(),
            remote_url: String::new(),
            remote_table: String::new(),
            api_token_env: default_api_token_env(),
        }
    }
}

fn default_backend() -> String {
    "file".into()
}
fn default_file_path() -> String {
    "_data/affiliate_links.json".into()
}
fn default_api_token_env() -> String {
    "LINKFORGE_API_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.linkforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LinkForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.linkforge/linkforge.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| LinkForgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        LinkForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LinkForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LinkForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LinkForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the remote store token env var is set and non-empty.
/// Only required when the remote backend is selected.
pub fn resolve_api_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.storage.api_token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(LinkForgeError::config(format!(
            "remote store token not found. Set the {var_name} environment variable."
        ))),
    }
}
