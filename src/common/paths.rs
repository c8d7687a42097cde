//! Configuration file locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/gatecheck/`
//! - macOS: `~/Library/Application Support/gatecheck/`
//! - Windows: `%APPDATA%\gatecheck\`

use std::path::PathBuf;

/// Application name used for config and data directories
const APP_NAME: &str = "gatecheck";

/// Default directory searched for scenarios when no path is given
pub const DEFAULT_SCENARIO_DIR: &str = "scenarios";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
