//! Scenario results
//!
//! A [`ScenarioReport`] is the ordered log of one run: every step and
//! assertion with its status, the overall outcome and the teardown result.
//! Reports print to the console and serialize to the JSON report file.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use crate::common::{Error, FailureReason, Result};

/// Lifecycle of a scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

/// Why a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// A step failed; later steps and all assertions were skipped
    StepFailed { index: usize, reason: FailureReason },
    /// First failing assertion; the others were still evaluated
    AssertionFailed { index: usize, reason: FailureReason },
    /// The overall scenario timeout fired
    ScenarioTimeout { reason: FailureReason },
    /// No session could be opened, so nothing ran
    SessionFailed { reason: FailureReason },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            Outcome::Success => None,
            Outcome::StepFailed { reason, .. }
            | Outcome::AssertionFailed { reason, .. }
            | Outcome::ScenarioTimeout { reason }
            | Outcome::SessionFailed { reason } => Some(reason),
        }
    }
}

/// Status of a single step or assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Status {
    Passed,
    /// Failed, but the failure does not count (best-effort waits)
    Tolerated { reason: FailureReason },
    Failed { reason: FailureReason },
    Skipped,
}

/// One line of the run log
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Zero-based position within the steps or assertions list
    pub index: usize,
    pub description: String,
    pub status: Status,
    pub elapsed_ms: u64,
}

impl Record {
    pub fn new(index: usize, description: impl ToString, status: Status, elapsed: Duration) -> Self {
        Self {
            index,
            description: description.to_string(),
            status,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn skipped(index: usize, description: impl ToString) -> Self {
        Self::new(index, description, Status::Skipped, Duration::ZERO)
    }
}

/// Result of closing the browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Teardown {
    /// The session was never opened
    NotNeeded,
    Closed,
    Failed { reason: FailureReason },
}

/// Result of running one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<String>,
    pub state: RunState,
    pub outcome: Outcome,
    pub steps: Vec<Record>,
    pub assertions: Vec<Record>,
    pub teardown: Teardown,
    /// Page URL when the run ended, if it could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.state == RunState::Succeeded
    }
}

/// Results of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
    pub elapsed_ms: u64,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn new(scenarios: Vec<ScenarioReport>, elapsed: Duration) -> Self {
        let passed = scenarios.iter().filter(|s| s.passed()).count();
        Self {
            passed,
            failed: scenarios.len() - passed,
            total: scenarios.len(),
            elapsed_ms: elapsed.as_millis() as u64,
            scenarios,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }
}

fn print_record(label: &str, record: &Record, verbose: bool) {
    let number = record.index + 1;
    match &record.status {
        Status::Passed => {
            if verbose {
                println!(
                    "  {} {} {}: {} {}",
                    "✓".green(),
                    label,
                    number,
                    record.description.dimmed(),
                    format!("({} ms)", record.elapsed_ms).dimmed()
                );
            } else {
                println!("  {} {} {}: {}", "✓".green(), label, number, record.description.dimmed());
            }
        }
        Status::Tolerated { reason } => {
            println!(
                "  {} {} {}: {} {}",
                "~".yellow(),
                label,
                number,
                record.description.dimmed(),
                format!("(ignored: {})", reason).yellow()
            );
        }
        Status::Failed { reason } => {
            println!("  {} {} {}: {}", "✗".red(), label, number, record.description);
            println!("      {}", reason.message.red());
        }
        Status::Skipped => {
            if verbose {
                println!("  {} {} {}: {}", "-".dimmed(), label, number, "skipped".dimmed());
            }
        }
    }
}

/// Print one scenario's run log
pub fn print_scenario(report: &ScenarioReport, verbose: bool) {
    println!(
        "\n{} {}",
        "Scenario:".blue().bold(),
        report.name.white().bold()
    );

    if let Some(desc) = &report.description {
        println!("  {}", desc.dimmed());
    }
    if verbose {
        println!("  {}", report.path.dimmed());
        for precondition in &report.preconditions {
            println!("  {} {}", "requires:".dimmed(), precondition.dimmed());
        }
    }

    if !report.steps.is_empty() {
        println!("\n{}", "Steps:".cyan());
        for record in &report.steps {
            print_record("Step", record, verbose);
        }
    }

    if !report.assertions.is_empty() {
        println!("\n{}", "Assertions:".cyan());
        for record in &report.assertions {
            print_record("Assert", record, verbose);
        }
    }

    if let Teardown::Failed { reason } = &report.teardown {
        println!("  {} teardown: {}", "!".yellow(), reason.message.yellow());
    }

    match &report.outcome {
        Outcome::Success => println!(
            "\n{} {} {}",
            "✓".green().bold(),
            "Passed".green().bold(),
            format!("({} ms)", report.elapsed_ms).dimmed()
        ),
        outcome => {
            let message = outcome.reason().map(|r| r.message.as_str()).unwrap_or("");
            println!("\n{} {} {}", "✗".red().bold(), "Failed:".red().bold(), message);
            if let Some(url) = &report.final_url {
                println!("  {} {}", "at".dimmed(), url.dimmed());
            }
        }
    }
}

/// Print the totals line
pub fn print_summary(suite: &SuiteReport) {
    let elapsed = format!("in {:.1}s", suite.elapsed_ms as f64 / 1000.0);
    if suite.all_passed() {
        println!(
            "\n{} {} {}\n",
            "Summary:".bold(),
            format!("{} passed", suite.passed).green().bold(),
            elapsed.dimmed()
        );
    } else {
        println!(
            "\n{} {}, {} {}\n",
            "Summary:".bold(),
            format!("{} passed", suite.passed).green(),
            format!("{} failed", suite.failed).red().bold(),
            elapsed.dimmed()
        );
        for report in suite.scenarios.iter().filter(|r| !r.passed()) {
            println!("  {} {} ({})", "✗".red(), report.name, report.path.dimmed());
        }
        println!();
    }
}
