//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations.

use std::path::PathBuf;

/// Application name used for config directories
const APP_NAME: &str = "api-harness";

/// Get the configuration directory path
///
/// - Linux: `~/.config/api-harness/`
/// - macOS: `~/Library/Application Support/api-harness/`
/// - Windows: `%APPDATA%\api-harness\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the default configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
