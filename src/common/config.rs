//! Configuration file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Environment variable that overrides the target base URL
pub const BASE_URL_ENV: &str = "API_HARNESS_BASE_URL";

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Target system settings
    #[serde(default)]
    pub target: TargetConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Response fields that carry session credentials
    #[serde(default)]
    pub auth: AuthFields,

    /// Console report settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where the API under test lives and how paths map onto it
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Base address of the target, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Prefix of the primary API namespace
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Path prefix that selects the unprefixed root namespace
    #[serde(default = "default_root_sentinel")]
    pub root_sentinel: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            root_sentinel: default_root_sentinel(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_prefix() -> String {
    "api".to_string()
}

fn default_root_sentinel() -> String {
    "../".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Whole-request timeout. 0 waits indefinitely.
    #[serde(default = "default_request")]
    pub request_secs: u64,

    /// TCP connect timeout. 0 uses the transport default.
    #[serde(default = "default_connect")]
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: default_request(),
            connect_secs: default_connect(),
        }
    }
}

fn default_request() -> u64 {
    30
}
fn default_connect() -> u64 {
    10
}

impl Timeouts {
    pub fn request(&self) -> Option<Duration> {
        (self.request_secs > 0).then(|| Duration::from_secs(self.request_secs))
    }

    pub fn connect(&self) -> Option<Duration> {
        (self.connect_secs > 0).then(|| Duration::from_secs(self.connect_secs))
    }
}

/// Names of the response fields adopted into the session
#[derive(Debug, Deserialize, Clone)]
pub struct AuthFields {
    #[serde(default = "default_token_field")]
    pub token_field: String,

    #[serde(default = "default_identity_field")]
    pub identity_field: String,
}

impl Default for AuthFields {
    fn default() -> Self {
        Self {
            token_field: default_token_field(),
            identity_field: default_identity_field(),
        }
    }
}

fn default_token_field() -> String {
    "access_token".to_string()
}

fn default_identity_field() -> String {
    "user".to_string()
}

/// Console report settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Maximum characters of a response kept in the ledger and report
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            snippet_chars: default_snippet_chars(),
        }
    }
}

fn default_snippet_chars() -> usize {
    200
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.normalize()?;
        Ok(config)
    }

    /// Apply the base URL environment override, if set
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.set_base_url(&url)?;
            }
        }
        Ok(())
    }

    /// Replace the target base URL
    pub fn set_base_url(&mut self, url: &str) -> Result<()> {
        self.target.base_url = url.to_string();
        self.normalize()
    }

    fn normalize(&mut self) -> Result<()> {
        let base = self.target.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(Error::Config("target.base_url must not be empty".to_string()));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(Error::Config(format!(
                "target.base_url must start with http:// or https://, got '{}'",
                base
            )));
        }
        self.target.base_url = base.to_string();
        self.target.api_prefix = self.target.api_prefix.trim_matches('/').to_string();
        if self.target.root_sentinel.is_empty() {
            return Err(Error::Config(
                "target.root_sentinel must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
