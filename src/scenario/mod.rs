//! Scenario model and execution
//!
//! Scenarios are YAML files describing browser steps and post-conditions:
//!
//! ```yaml
//! name: Unauthenticated users are denied
//! steps:
//!   - action: navigate
//!     path: /admin
//!   - action: wait_for_load_state
//! assertions:
//!   - expect: visible
//!     locator: text=Access denied
//!   - expect: absent
//!     locator: text=Logout
//! ```

pub mod config;
pub mod loader;
pub mod locator;
pub mod report;
pub mod runner;
pub mod suite;
pub mod wait;

pub use config::{Assertion, LoadState, Scenario, Step};
pub use loader::{discover, load_all, parse_var_overrides, LoadedScenario, Variables};
pub use locator::{By, Locator, Query};
pub use report::{Outcome, RunState, ScenarioReport, Status, SuiteReport, Teardown};
pub use runner::{run_scenario, RunOptions};
pub use suite::run_suite;
