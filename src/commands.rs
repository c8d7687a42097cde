//! CLI command definitions
//!
//! Defines the clap commands for the gatecheck CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::BrowserKind;
use crate::common::paths::DEFAULT_SCENARIO_DIR;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios against a live target through a WebDriver browser
    Run {
        #[command(flatten)]
        selection: Selection,

        /// Base URL of the application under test
        #[arg(long, env = "GATECHECK_BASE_URL")]
        base_url: Option<String>,

        /// WebDriver server URL
        #[arg(long, env = "GATECHECK_WEBDRIVER_URL")]
        webdriver: Option<String>,

        /// Browser to request from the WebDriver server
        #[arg(long, value_enum)]
        browser: Option<BrowserKind>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Driver command to spawn if the WebDriver server is not running
        /// (e.g. chromedriver)
        #[arg(long)]
        spawn_driver: Option<String>,

        /// Number of scenarios to run concurrently
        #[arg(long, short = 'j')]
        parallel: Option<usize>,

        /// Write a JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip the target reachability check
        #[arg(long)]
        no_preflight: bool,
    },

    /// List scenarios with their step and assertion counts
    List {
        #[command(flatten)]
        selection: Selection,
    },

    /// Validate scenarios without starting a browser
    Check {
        #[command(flatten)]
        selection: Selection,
    },
}

/// Which scenarios to load, and variable overrides
#[derive(Args, Debug, Clone)]
pub struct Selection {
    /// Scenario files or directories
    #[arg(default_value = DEFAULT_SCENARIO_DIR)]
    pub paths: Vec<PathBuf>,

    /// Set a scenario variable: --var owner_password=...
    /// Can be specified multiple times
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,
}
