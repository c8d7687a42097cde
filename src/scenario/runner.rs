//! Scenario runner
//!
//! Executes one scenario against one fresh browser session. Every failure that
//! happens inside the scenario ends up in the returned [`ScenarioReport`]; the
//! runner itself never errors.

use std::time::{Duration, Instant};

use crate::browser::{BrowserSession, Interaction, Session, SessionFactory, Visibility};
use crate::common::config::Timeouts;
use crate::common::{join_url, Error, FailureReason, Result};

use super::config::{Assertion, LoadState, Scenario, Step};
use super::loader::LoadedScenario;
use super::locator::Locator;
use super::report::{Outcome, Record, RunState, ScenarioReport, Status, Teardown};
use super::wait::Poller;

/// Upper bound for reading the page URL after a failure
const FINAL_URL_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound for closing the session; a driver stuck on an abandoned
/// command may never answer
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by every scenario in a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Base URL used when the scenario does not set its own
    pub base_url: String,
    pub timeouts: Timeouts,
}

impl RunOptions {
    fn base_url<'a>(&'a self, scenario: &'a Scenario) -> &'a str {
        scenario.base_url.as_deref().unwrap_or(&self.base_url)
    }

    fn scenario_timeout(&self, scenario: &Scenario) -> Duration {
        scenario
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.timeouts.scenario())
    }
}

/// Step and assertion records collected while a scenario executes
///
/// Lives outside the timed future so that partial progress survives a
/// scenario timeout.
#[derive(Default)]
struct Progress {
    steps: Vec<Record>,
    assertions: Vec<Record>,
}

impl Progress {
    /// Mark whatever did not get a record: the item in flight gets `reason`
    /// (if any), everything after it is skipped.
    fn close_out(&mut self, scenario: &Scenario, mut in_flight: Option<FailureReason>) {
        let pending = scenario
            .steps
            .iter()
            .map(|s| s.to_string())
            .enumerate()
            .skip(self.steps.len())
            .collect::<Vec<_>>();
        for (index, description) in pending {
            self.steps.push(match in_flight.take() {
                Some(reason) => Record::new(index, description, Status::Failed { reason }, Duration::ZERO),
                None => Record::skipped(index, description),
            });
        }

        let pending = scenario
            .assertions
            .iter()
            .map(|a| a.to_string())
            .enumerate()
            .skip(self.assertions.len())
            .collect::<Vec<_>>();
        for (index, description) in pending {
            self.assertions.push(match in_flight.take() {
                Some(reason) => Record::new(index, description, Status::Failed { reason }, Duration::ZERO),
                None => Record::skipped(index, description),
            });
        }
    }
}

/// Tracks the run state and logs each transition
struct StateMachine<'a> {
    name: &'a str,
    state: RunState,
}

impl<'a> StateMachine<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            state: RunState::NotStarted,
        }
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(scenario = %self.name, from = ?self.state, to = ?next, "Scenario state change");
        self.state = next;
    }
}

/// Run a single scenario in its own browser session
///
/// The session is closed exactly once, whatever the outcome.
pub async fn run_scenario(
    loaded: &LoadedScenario,
    factory: &dyn SessionFactory,
    options: &RunOptions,
) -> ScenarioReport {
    let scenario = &loaded.scenario;
    let started = Instant::now();
    let mut machine = StateMachine::new(&scenario.name);
    let mut progress = Progress::default();

    tracing::info!(scenario = %scenario.name, path = %loaded.path.display(), "Running scenario");

    let mut session = match Session::open(factory).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(scenario = %scenario.name, "Could not open browser session: {}", e);
            machine.transition(RunState::Failed);
            progress.close_out(scenario, None);
            return build_report(
                loaded,
                machine.state,
                Outcome::SessionFailed { reason: e.into() },
                progress,
                Teardown::NotNeeded,
                None,
                started,
            );
        }
    };
    machine.transition(RunState::Running);

    let limit = options.scenario_timeout(scenario);
    let execution = execute(session.driver(), scenario, options, &mut progress);
    let result = tokio::time::timeout(limit, execution).await;
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(_) => {
            let reason = FailureReason::from(Error::ScenarioTimeout(limit.as_secs()));
            tracing::warn!(scenario = %scenario.name, "{}", reason);
            progress.close_out(scenario, Some(reason.clone()));
            Outcome::ScenarioTimeout { reason }
        }
    };
    progress.close_out(scenario, None);

    let final_url = if outcome.is_success() {
        None
    } else {
        tokio::time::timeout(FINAL_URL_TIMEOUT, session.driver().current_url())
            .await
            .ok()
            .and_then(|url| url.ok())
    };

    let teardown = match tokio::time::timeout(TEARDOWN_TIMEOUT, session.close()).await {
        Ok(Ok(())) => Teardown::Closed,
        Ok(Err(e)) => Teardown::Failed { reason: e.into() },
        Err(_) => Teardown::Failed {
            reason: Error::Driver(format!(
                "session close did not finish within {} seconds",
                TEARDOWN_TIMEOUT.as_secs()
            ))
            .into(),
        },
    };

    machine.transition(if outcome.is_success() {
        RunState::Succeeded
    } else {
        RunState::Failed
    });

    tracing::info!(
        scenario = %scenario.name,
        passed = outcome.is_success(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Scenario finished"
    );

    build_report(loaded, machine.state, outcome, progress, teardown, final_url, started)
}

fn build_report(
    loaded: &LoadedScenario,
    state: RunState,
    outcome: Outcome,
    progress: Progress,
    teardown: Teardown,
    final_url: Option<String>,
    started: Instant,
) -> ScenarioReport {
    let scenario = &loaded.scenario;
    ScenarioReport {
        name: scenario.name.clone(),
        path: loaded.path.display().to_string(),
        description: scenario.description.clone(),
        preconditions: scenario.preconditions.clone(),
        state,
        outcome,
        steps: progress.steps,
        assertions: progress.assertions,
        teardown,
        final_url,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

/// Best-effort steps: their failure is recorded but does not stop the run
fn is_tolerated(step: &Step) -> bool {
    matches!(step, Step::WaitForLoadState { .. })
}

/// Steps, then assertions
async fn execute(
    driver: &mut dyn BrowserSession,
    scenario: &Scenario,
    options: &RunOptions,
    progress: &mut Progress,
) -> Outcome {
    let base_url = options.base_url(scenario);

    for (index, step) in scenario.steps.iter().enumerate() {
        tracing::debug!(step = index + 1, "{}", step);
        let started = Instant::now();

        let status = match run_step(driver, step, base_url, &options.timeouts).await {
            Ok(()) => Status::Passed,
            Err(e) if is_tolerated(step) => {
                tracing::debug!(step = index + 1, "Ignoring best-effort failure: {}", e);
                Status::Tolerated { reason: e.into() }
            }
            Err(e) => {
                tracing::debug!(step = index + 1, "Step failed: {}", e);
                let reason = FailureReason::from(e);
                progress.steps.push(Record::new(
                    index,
                    step,
                    Status::Failed {
                        reason: reason.clone(),
                    },
                    started.elapsed(),
                ));
                return Outcome::StepFailed { index, reason };
            }
        };
        progress
            .steps
            .push(Record::new(index, step, status, started.elapsed()));
    }

    let mut first_failure = None;
    for (index, assertion) in scenario.assertions.iter().enumerate() {
        tracing::debug!(assertion = index + 1, "{}", assertion);
        let started = Instant::now();

        let status = match check_assertion(driver, assertion, &options.timeouts).await {
            Ok(()) => Status::Passed,
            Err(e) => {
                tracing::debug!(assertion = index + 1, "Assertion failed: {}", e);
                let reason = FailureReason::from(e);
                if first_failure.is_none() {
                    first_failure = Some((index, reason.clone()));
                }
                Status::Failed { reason }
            }
        };
        progress
            .assertions
            .push(Record::new(index, assertion, status, started.elapsed()));
    }

    match first_failure {
        Some((index, reason)) => Outcome::AssertionFailed { index, reason },
        None => Outcome::Success,
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

async fn run_step(
    driver: &mut dyn BrowserSession,
    step: &Step,
    base_url: &str,
    timeouts: &Timeouts,
) -> Result<()> {
    let timeout = step.timeout(timeouts);
    let interval = timeouts.poll_interval();

    match step {
        Step::Navigate { path, .. } => {
            let url = join_url(base_url, path)?;
            let result = tokio::time::timeout(timeout, driver.navigate(&url)).await;
            match result {
                Ok(result) => result,
                Err(_) => Err(Error::NavigationTimeout {
                    url,
                    ms: millis(timeout),
                }),
            }
        }
        Step::Fill { locator, value, .. } => {
            interact(driver, locator, Action::Fill(value), timeout, interval).await
        }
        Step::Click { locator, .. } => {
            interact(driver, locator, Action::Click, timeout, interval).await
        }
        Step::WaitFor { locator, .. } => {
            if await_visibility(driver, locator, true, timeout, interval).await? {
                Ok(())
            } else {
                Err(Error::ElementNotFound {
                    locator: locator.to_string(),
                    ms: millis(timeout),
                })
            }
        }
        Step::Wait { .. } => {
            tokio::time::sleep(timeout).await;
            Ok(())
        }
        Step::WaitForLoadState { state, .. } => {
            wait_for_load_state(driver, *state, timeout, interval).await
        }
    }
}

#[derive(Clone, Copy)]
enum Action<'a> {
    Fill(&'a str),
    Click,
}

impl Action<'_> {
    fn name(&self) -> &'static str {
        match self {
            Action::Fill(_) => "fill",
            Action::Click => "click",
        }
    }
}

/// Retry a fill or click until the element exists and accepts it
async fn interact(
    driver: &mut dyn BrowserSession,
    locator: &Locator,
    action: Action<'_>,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let mut poller = Poller::new(timeout, interval);
    let mut refusal: Option<String> = None;

    loop {
        let attempt = match action {
            Action::Fill(value) => driver.fill(locator, value),
            Action::Click => driver.click(locator),
        };
        match poller.probe(attempt).await {
            Some(Ok(Interaction::Done)) => return Ok(()),
            Some(Ok(Interaction::Missing)) | None => {}
            Some(Ok(Interaction::NotReady(reason))) => refusal = Some(reason),
            Some(Err(e)) => return Err(e),
        }
        if !poller.tick().await {
            break;
        }
    }

    tracing::trace!(attempts = poller.attempts(), "{} {} gave up", action.name(), locator);
    Err(match refusal {
        Some(reason) => Error::ActionTimeout {
            action: action.name().to_string(),
            locator: locator.to_string(),
            ms: millis(timeout),
            reason,
        },
        None => Error::ElementNotFound {
            locator: locator.to_string(),
            ms: millis(timeout),
        },
    })
}

async fn wait_for_load_state(
    driver: &mut dyn BrowserSession,
    state: LoadState,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let mut poller = Poller::new(timeout, interval);
    loop {
        if let Some(ready) = poller.probe(driver.ready_state()).await {
            if state.is_reached(&ready?) {
                return Ok(());
            }
        }
        if !poller.tick().await {
            return Err(Error::LoadStateTimeout {
                state: state.to_string(),
                ms: millis(timeout),
            });
        }
    }
}

/// Poll until the element's display state matches the assertion
async fn check_assertion(
    driver: &mut dyn BrowserSession,
    assertion: &Assertion,
    timeouts: &Timeouts,
) -> Result<()> {
    let timeout = assertion.timeout(timeouts);
    let locator = assertion.locator();
    let want_visible = assertion.expects_visible();

    if await_visibility(driver, locator, want_visible, timeout, timeouts.poll_interval()).await? {
        Ok(())
    } else {
        Err(Error::AssertionTimeout {
            locator: locator.to_string(),
            expected: if want_visible { "visible" } else { "absent" }.to_string(),
            ms: millis(timeout),
        })
    }
}

/// Poll until the locator is (or is not) displayed
///
/// Returns `Ok(false)` when the deadline passes first. A `Stale` probe gives
/// no verdict either way.
async fn await_visibility(
    driver: &mut dyn BrowserSession,
    locator: &Locator,
    want_visible: bool,
    timeout: Duration,
    interval: Duration,
) -> Result<bool> {
    let mut poller = Poller::new(timeout, interval);
    loop {
        let verdict = match poller.probe(driver.visibility(locator)).await {
            Some(Ok(Visibility::Stale)) | None => None,
            Some(Ok(visibility)) => Some(visibility == Visibility::Visible),
            Some(Err(e)) => return Err(e),
        };
        if verdict == Some(want_visible) {
            return Ok(true);
        }
        if !poller.tick().await {
            tracing::trace!(attempts = poller.attempts(), "{} did not settle", locator);
            return Ok(false);
        }
    }
}
