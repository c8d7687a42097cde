//! Error types for gatecheck
//!
//! Scenario-local failures (timeouts, missing elements) live in the same enum
//! as configuration and driver errors. The runner never propagates the former
//! out of a scenario; it records them as a [`FailureReason`] instead.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gatecheck
#[derive(Error, Debug)]
pub enum Error {
    // === WebDriver Errors ===
    #[error("WebDriver not reachable at {url}. Start chromedriver/geckodriver or set [webdriver].spawn in the config")]
    DriverNotRunning { url: String },

    #[error("WebDriver '{command}' did not become ready within {secs} seconds")]
    DriverSpawnTimeout { command: String, secs: u64 },

    #[error("WebDriver command '{0}' not found in PATH")]
    DriverNotFound(String),

    #[error("Failed to start browser session: {0}")]
    SessionStart(String),

    #[error("Browser driver error: {0}")]
    Driver(String),

    // === Target Errors ===
    #[error("Target application not reachable at {url}: {reason}")]
    TargetUnreachable { url: String, reason: String },

    // === Step Errors ===
    #[error("Navigation to {url} timed out after {ms} ms")]
    NavigationTimeout { url: String, ms: u64 },

    #[error("Page did not reach load state '{state}' within {ms} ms")]
    LoadStateTimeout { state: String, ms: u64 },

    #[error("No element matched {locator} within {ms} ms")]
    ElementNotFound { locator: String, ms: u64 },

    #[error("Could not {action} {locator} within {ms} ms: {reason}")]
    ActionTimeout {
        action: String,
        locator: String,
        ms: u64,
        reason: String,
    },

    #[error("Expected {locator} to be {expected} within {ms} ms")]
    AssertionTimeout {
        locator: String,
        expected: String,
        ms: u64,
    },

    #[error("Scenario exceeded its overall timeout of {0} seconds")]
    ScenarioTimeout(u64),

    // === Scenario Errors ===
    #[error("Invalid scenario '{path}': {message}")]
    ScenarioParse { path: String, message: String },

    #[error("Invalid locator '{input}': {reason}")]
    InvalidLocator { input: String, reason: String },

    #[error("Unresolved variable '${{{name}}}'. Define it under 'vars', via GATECHECK_VAR_{env}, or with --var {name}=...")]
    UnresolvedVariable { name: String, env: String },

    #[error("No scenario files found in {0}")]
    NoScenarios(String),

    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a scenario parse error for a file
    pub fn scenario_parse(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::ScenarioParse {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create an invalid locator error
    pub fn invalid_locator(input: &str, reason: &str) -> Self {
        Self::InvalidLocator {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an unresolved variable error with the matching env var name
    pub fn unresolved_variable(name: &str) -> Self {
        Self::UnresolvedVariable {
            name: name.to_string(),
            env: name.to_uppercase(),
        }
    }

    /// Stable machine-readable code, used in JSON reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::DriverNotRunning { .. } => "DRIVER_NOT_RUNNING",
            Error::DriverSpawnTimeout { .. } => "DRIVER_SPAWN_TIMEOUT",
            Error::DriverNotFound(_) => "DRIVER_NOT_FOUND",
            Error::SessionStart(_) => "SESSION_START_FAILED",
            Error::Driver(_) => "DRIVER_ERROR",
            Error::TargetUnreachable { .. } => "TARGET_UNREACHABLE",
            Error::NavigationTimeout { .. } => "NAVIGATION_TIMEOUT",
            Error::LoadStateTimeout { .. } => "LOAD_STATE_TIMEOUT",
            Error::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
            Error::ActionTimeout { .. } => "ACTION_TIMEOUT",
            Error::AssertionTimeout { .. } => "ASSERTION_TIMEOUT",
            Error::ScenarioTimeout(_) => "SCENARIO_TIMEOUT",
            Error::ScenarioParse { .. }
            | Error::InvalidLocator { .. }
            | Error::UnresolvedVariable { .. } => "INVALID_SCENARIO",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Process exit code for errors that reach `main`
    ///
    /// Failed scenarios exit with 1; anything that prevented a run exits with 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ScenariosFailed { .. } => 1,
            _ => 2,
        }
    }
}

/// Serializable failure description recorded in scenario reports
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FailureReason {
    pub code: String,
    pub message: String,
}

impl From<&Error> for FailureReason {
    fn from(e: &Error) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

impl From<Error> for FailureReason {
    fn from(e: Error) -> Self {
        Self::from(&e)
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
