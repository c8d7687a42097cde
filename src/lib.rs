//! gatecheck - browser scenarios for admin access control
//!
//! This library loads declarative UI scenarios and runs them against a web
//! application through a WebDriver-controlled browser, one isolated session
//! per scenario.

pub mod browser;
pub mod cli;
pub mod commands;
pub mod common;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use scenario::{LoadedScenario, RunOptions, ScenarioReport};
