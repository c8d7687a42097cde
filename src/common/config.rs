//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Application under test
    #[serde(default)]
    pub target: TargetConfig,

    /// WebDriver endpoint and browser settings
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Suite execution settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Application under test
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Base URL that scenario paths are joined to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Check the base URL answers before running scenarios
    #[serde(default = "default_true")]
    pub preflight: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            preflight: true,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_true() -> bool {
    true
}

/// Browser family requested from the WebDriver server
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    /// Chrome / Chromium via chromedriver
    #[default]
    Chrome,
    /// Firefox via geckodriver
    Firefox,
}

impl BrowserKind {
    /// WebDriver `browserName` capability
    pub fn capability_name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
        }
    }
}

/// WebDriver page load strategy
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageLoadStrategy {
    /// Wait for the load event
    #[default]
    Normal,
    /// Wait for DOMContentLoaded
    Eager,
    /// Return as soon as navigation is committed
    None,
}

impl PageLoadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageLoadStrategy::Normal => "normal",
            PageLoadStrategy::Eager => "eager",
            PageLoadStrategy::None => "none",
        }
    }
}

/// WebDriver endpoint and browser settings
#[derive(Debug, Deserialize, Clone)]
pub struct WebDriverConfig {
    /// WebDriver server URL
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// Browser to request
    #[serde(default)]
    pub browser: BrowserKind,

    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Window size as [width, height]
    #[serde(default = "default_window_size")]
    pub window_size: [u32; 2],

    /// Extra browser command-line arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Page load strategy for navigation
    #[serde(default)]
    pub page_load_strategy: PageLoadStrategy,

    /// Driver command to spawn when the endpoint is not reachable
    /// (e.g. "chromedriver"). Unset means never spawn.
    #[serde(default)]
    pub spawn: Option<String>,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            browser: BrowserKind::default(),
            headless: true,
            window_size: default_window_size(),
            args: Vec::new(),
            page_load_strategy: PageLoadStrategy::default(),
            spawn: None,
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_window_size() -> [u32; 2] {
    [1280, 720]
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Default timeout for navigate steps
    #[serde(default = "default_navigation")]
    pub navigation_ms: u64,

    /// Default timeout for fill and click steps
    #[serde(default = "default_action")]
    pub action_ms: u64,

    /// Default timeout for assertions
    #[serde(default = "default_assertion")]
    pub assertion_ms: u64,

    /// Default timeout for wait_for_load_state steps
    #[serde(default = "default_load_state")]
    pub load_state_ms: u64,

    /// Default overall scenario timeout
    #[serde(default = "default_scenario")]
    pub scenario_secs: u64,

    /// Delay between polls while waiting on the page
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Timeout for creating a browser session
    #[serde(default = "default_session_start")]
    pub session_start_secs: u64,

    /// Timeout for a spawned driver to report ready
    #[serde(default = "default_driver_start")]
    pub driver_start_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation(),
            action_ms: default_action(),
            assertion_ms: default_assertion(),
            load_state_ms: default_load_state(),
            scenario_secs: default_scenario(),
            poll_interval_ms: default_poll_interval(),
            session_start_secs: default_session_start(),
            driver_start_secs: default_driver_start(),
        }
    }
}

fn default_navigation() -> u64 {
    10_000
}
fn default_action() -> u64 {
    5_000
}
fn default_assertion() -> u64 {
    30_000
}
fn default_load_state() -> u64 {
    3_000
}
fn default_scenario() -> u64 {
    300
}
fn default_poll_interval() -> u64 {
    100
}
fn default_session_start() -> u64 {
    30
}
fn default_driver_start() -> u64 {
    10
}

impl Timeouts {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn scenario(&self) -> Duration {
        Duration::from_secs(self.scenario_secs)
    }
}

/// Suite execution settings
#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// Number of scenarios run concurrently
    #[serde(default = "default_parallel")]
    pub parallel: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

fn default_parallel() -> usize {
    1
}

impl Config {
    /// Load configuration from an explicit file or the default config file
    ///
    /// An explicit path must exist. The default file is optional and
    /// missing means default configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => config_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                Self::parse(&content)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
