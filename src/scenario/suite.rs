//! Running many scenarios

use std::time::Instant;

use futures_util::stream::{self, StreamExt};

use crate::browser::SessionFactory;

use super::loader::LoadedScenario;
use super::report::{ScenarioReport, SuiteReport};
use super::runner::{run_scenario, RunOptions};

/// Run scenarios with at most `parallel` in flight at once
///
/// Each scenario gets its own session from `factory`. `on_done` is called as
/// each scenario completes (completion order); the returned report lists
/// scenarios in input order.
pub async fn run_suite(
    scenarios: &[LoadedScenario],
    factory: &dyn SessionFactory,
    options: &RunOptions,
    parallel: usize,
    mut on_done: impl FnMut(&ScenarioReport),
) -> SuiteReport {
    let started = Instant::now();
    let parallel = parallel.max(1);
    tracing::info!(count = scenarios.len(), parallel, "Running scenarios");

    let mut results: Vec<(usize, ScenarioReport)> = stream::iter(scenarios.iter().enumerate())
        .map(|(position, loaded)| async move {
            (position, run_scenario(loaded, factory, options).await)
        })
        .buffer_unordered(parallel)
        .inspect(|(_, report)| on_done(report))
        .collect()
        .await;

    results.sort_by_key(|(position, _)| *position);
    SuiteReport::new(
        results.into_iter().map(|(_, report)| report).collect(),
        started.elapsed(),
    )
}
