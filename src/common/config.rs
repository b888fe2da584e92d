//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Browser settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Suite runner settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Default settings
#[derive(Debug, Deserialize, Clone)]
pub struct Defaults {
    /// Base URL used when neither the suite nor the CLI gives one
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// How long an assertion keeps re-polling before it fails
    #[serde(default = "default_assertion_ms")]
    pub assertion_ms: u64,

    /// Delay between two evaluations of the same assertion
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Page load timeout
    #[serde(default = "default_navigation")]
    pub navigation_secs: u64,

    /// Browser startup timeout
    #[serde(default = "default_launch")]
    pub launch_secs: u64,

    /// Base URL reachability check timeout
    #[serde(default = "default_preflight")]
    pub preflight_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            assertion_ms: default_assertion_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            navigation_secs: default_navigation(),
            launch_secs: default_launch(),
            preflight_secs: default_preflight(),
        }
    }
}

fn default_assertion_ms() -> u64 {
    4000
}
fn default_poll_interval_ms() -> u64 {
    50
}
fn default_navigation() -> u64 {
    30
}
fn default_launch() -> u64 {
    20
}
fn default_preflight() -> u64 {
    10
}

impl Timeouts {
    pub fn assertion(&self) -> Duration {
        Duration::from_millis(self.assertion_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }

    pub fn launch(&self) -> Duration {
        Duration::from_secs(self.launch_secs)
    }

    pub fn preflight(&self) -> Duration {
        Duration::from_secs(self.preflight_secs)
    }
}

/// Browser settings
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    /// Chrome/Chromium executable; searched on PATH when unset
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Run without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Extra command line switches passed to the browser
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: default_headless(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            args: Vec::new(),
        }
    }
}

fn default_headless() -> bool {
    true
}
fn default_viewport_width() -> u32 {
    1280
}
fn default_viewport_height() -> u32 {
    720
}

/// Executable names tried on PATH, in order
const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

impl BrowserSettings {
    /// Resolve the browser executable
    ///
    /// Returns None when nothing is configured or found on PATH, leaving
    /// detection to the CDP launcher.
    pub fn resolve_executable(&self) -> Option<PathBuf> {
        if let Some(path) = &self.executable {
            return Some(path.clone());
        }
        BROWSER_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
    }
}

/// Suite runner settings
#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// Maximum number of scenarios running at once
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
        }
    }
}

fn default_jobs() -> usize {
    1
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

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
