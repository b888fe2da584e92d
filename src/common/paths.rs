//! Configuration and data paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/pagecheck/`
//! - macOS: `~/Library/Application Support/pagecheck/`
//! - Windows: `%APPDATA%\pagecheck\`

use std::path::PathBuf;

/// Application name used for config and data directories
const APP_NAME: &str = "pagecheck";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Directory for throwaway browser profiles
///
/// Falls back to the system temp dir when no data dir is available.
pub fn profile_root() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.cache_dir().join("profiles"))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME).join("profiles"))
}
