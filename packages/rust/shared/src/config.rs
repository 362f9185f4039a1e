//! Application configuration for polycrawl.
//!
//! User config lives at `~/.polycrawl/polycrawl.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PolycrawlError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "polycrawl.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".polycrawl";

// ---------------------------------------------------------------------------
// Config structs (matching polycrawl.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl driver settings.
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Document index settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Freshness cache and service settings.
    #[serde(default)]
    pub freshness: FreshnessConfig,
}

/// `[crawler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Delay between consecutive fetches, in milliseconds.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Response bodies are truncated to this many bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// Stop after this many fetched pages (0 = unlimited).
    #[serde(default)]
    pub max_pages: usize,

    /// Consult the freshness cache before every fetch.
    #[serde(default = "default_true")]
    pub use_freshness: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay(),
            request_timeout_secs: default_request_timeout(),
            max_response_bytes: default_max_response_bytes(),
            max_pages: 0,
            use_freshness: true,
        }
    }
}

fn default_request_delay() -> u64 {
    1000
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_response_bytes() -> usize {
    5 * 1024 * 1024
}
fn default_true() -> bool {
    true
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Document store endpoint accepting JSON documents.
    #[serde(default = "default_index_endpoint")]
    pub endpoint: String,

    /// Post page documents to the endpoint. When false, documents are only logged.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: default_index_endpoint(),
            enabled: true,
        }
    }
}

fn default_index_endpoint() -> String {
    "http://127.0.0.1:8983/solr/new_core/update/json/docs?commit=true".into()
}

/// `[freshness]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessConfig {
    /// Path to the freshness database.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Listen address for `polycrawl serve`.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Shared secret expected in the `Password` request header.
    #[serde(default = "default_password")]
    pub password: String,

    /// Weight byte written into new records.
    #[serde(default = "default_weight")]
    pub default_weight: u8,

    /// Age in seconds after which a record is stale.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u32,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            listen: default_listen(),
            password: default_password(),
            default_weight: default_weight(),
            stale_after_secs: default_stale_after(),
        }
    }
}

fn default_db_path() -> String {
    "data.db".into()
}
fn default_listen() -> String {
    "0.0.0.0:8999".into()
}
fn default_password() -> String {
    "disz".into()
}
fn default_weight() -> u8 {
    1
}
/// One day minus half a truncation window.
fn default_stale_after() -> u32 {
    86272
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Delay between consecutive fetches, in milliseconds.
    pub request_delay_ms: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Body read cap in bytes.
    pub max_response_bytes: usize,
    /// Page budget (0 = unlimited).
    pub max_pages: usize,
    /// Consult the freshness cache before fetching.
    pub use_freshness: bool,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            request_delay_ms: config.crawler.request_delay_ms,
            request_timeout_secs: config.crawler.request_timeout_secs,
            max_response_bytes: config.crawler.max_response_bytes,
            max_pages: config.crawler.max_pages,
            use_freshness: config.crawler.use_freshness,
        }
    }
}

/// Runtime freshness-cache parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessOptions {
    /// Weight byte written into new records.
    pub default_weight: u8,
    /// Age in seconds after which a record is stale.
    pub stale_after_secs: u32,
}

impl Default for FreshnessOptions {
    fn default() -> Self {
        Self {
            default_weight: default_weight(),
            stale_after_secs: default_stale_after(),
        }
    }
}

impl From<&AppConfig> for FreshnessOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_weight: config.freshness.default_weight,
            stale_after_secs: config.freshness.stale_after_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.polycrawl/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PolycrawlError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.polycrawl/polycrawl.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PolycrawlError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PolycrawlError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PolycrawlError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PolycrawlError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PolycrawlError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configurations no command can run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.crawler.max_response_bytes == 0 {
        return Err(PolycrawlError::config(
            "crawler.max_response_bytes must be greater than zero",
        ));
    }
    Ok(())
}

/// [`validate_config`] plus the checks only `polycrawl serve` needs.
pub fn validate_service_config(config: &AppConfig) -> Result<()> {
    validate_config(config)?;
    if config.freshness.password.is_empty() {
        return Err(PolycrawlError::config(
            "freshness.password must not be empty; every request would be rejected",
        ));
    }
    Ok(())
}
