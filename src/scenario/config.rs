//! Scenario configuration types
//!
//! Defines the data structures for deserializing YAML scenarios.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use super::locator::Locator;
use crate::common::config::Timeouts;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Conditions the target must satisfy; reported, not enforced
    #[serde(default)]
    pub preconditions: Vec<String>,
    /// Base URL override for this scenario
    pub base_url: Option<String>,
    /// Overall timeout for steps and assertions together
    pub timeout_secs: Option<u64>,
    /// Values substituted for `${name}` in paths and fill values
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Browser actions, executed in order
    pub steps: Vec<Step>,
    /// Post-conditions, evaluated after all steps
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

/// A single browser action
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a path relative to the base URL (or an absolute URL)
    Navigate {
        path: String,
        timeout_ms: Option<u64>,
    },
    /// Replace the value of an input
    Fill {
        locator: Locator,
        value: String,
        timeout_ms: Option<u64>,
    },
    /// Click an element
    Click {
        locator: Locator,
        timeout_ms: Option<u64>,
    },
    /// Wait until an element is displayed
    ///
    /// Gates later steps on page state that arrives asynchronously, such as
    /// the redirect after a sign-in request completes.
    WaitFor {
        locator: Locator,
        timeout_ms: Option<u64>,
    },
    /// Sleep unconditionally
    Wait { ms: u64 },
    /// Wait for the document to reach a load state (best effort)
    WaitForLoadState {
        #[serde(default)]
        state: LoadState,
        timeout_ms: Option<u64>,
    },
}

impl Step {
    /// Timeout for this step, falling back to the configured defaults
    pub fn timeout(&self, defaults: &Timeouts) -> Duration {
        let ms = match self {
            Step::Navigate { timeout_ms, .. } => timeout_ms.unwrap_or(defaults.navigation_ms),
            Step::Fill { timeout_ms, .. } | Step::Click { timeout_ms, .. } => {
                timeout_ms.unwrap_or(defaults.action_ms)
            }
            Step::WaitFor { timeout_ms, .. } => timeout_ms.unwrap_or(defaults.assertion_ms),
            Step::Wait { ms } => *ms,
            Step::WaitForLoadState { timeout_ms, .. } => {
                timeout_ms.unwrap_or(defaults.load_state_ms)
            }
        };
        Duration::from_millis(ms)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { path, .. } => write!(f, "navigate {}", path),
            // Values are often credentials; only their length is shown.
            Step::Fill { locator, value, .. } => {
                write!(f, "fill {} ({} chars)", locator, value.chars().count())
            }
            Step::Click { locator, .. } => write!(f, "click {}", locator),
            Step::WaitFor { locator, .. } => write!(f, "wait for {}", locator),
            Step::Wait { ms } => write!(f, "wait {} ms", ms),
            Step::WaitForLoadState { state, .. } => write!(f, "wait for {} state", state),
        }
    }
}

/// Document load states that can be awaited
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// DOM parsed (`readyState` is `interactive` or `complete`)
    #[default]
    DomContentLoaded,
    /// All resources loaded (`readyState` is `complete`)
    Load,
}

impl LoadState {
    /// Whether a `document.readyState` value satisfies this state
    pub fn is_reached(&self, ready_state: &str) -> bool {
        match self {
            LoadState::DomContentLoaded => matches!(ready_state, "interactive" | "complete"),
            LoadState::Load => ready_state == "complete",
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::DomContentLoaded => write!(f, "domcontentloaded"),
            LoadState::Load => write!(f, "load"),
        }
    }
}

/// A post-condition on the final page
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "expect", rename_all = "snake_case")]
pub enum Assertion {
    /// The element exists and is displayed
    Visible {
        locator: Locator,
        timeout_ms: Option<u64>,
    },
    /// The element does not exist or is not displayed
    Absent {
        locator: Locator,
        timeout_ms: Option<u64>,
    },
}

impl Assertion {
    pub fn locator(&self) -> &Locator {
        match self {
            Assertion::Visible { locator, .. } | Assertion::Absent { locator, .. } => locator,
        }
    }

    /// True for `visible`, false for `absent`
    pub fn expects_visible(&self) -> bool {
        matches!(self, Assertion::Visible { .. })
    }

    pub fn timeout(&self, defaults: &Timeouts) -> Duration {
        let ms = match self {
            Assertion::Visible { timeout_ms, .. } | Assertion::Absent { timeout_ms, .. } => {
                timeout_ms.unwrap_or(defaults.assertion_ms)
            }
        };
        Duration::from_millis(ms)
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::Visible { locator, .. } => write!(f, "visible {}", locator),
            Assertion::Absent { locator, .. } => write!(f, "absent {}", locator),
        }
    }
}
