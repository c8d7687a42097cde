//! CLI command handling
//!
//! Loads configuration and scenarios, prepares the WebDriver server and
//! formats output.

pub mod preflight;
pub mod spawn;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;

use crate::browser::WebDriverFactory;
use crate::commands::{Commands, Selection};
use crate::common::config::{BrowserKind, Config};
use crate::common::{Error, Result};
use crate::scenario::loader::{discover, LoadedScenario, Variables};
use crate::scenario::report::{print_scenario, print_summary};
use crate::scenario::{parse_var_overrides, run_suite, RunOptions};

/// Options that apply to every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, global: &GlobalOptions) -> Result<()> {
    match command {
        Commands::Run {
            selection,
            base_url,
            webdriver,
            browser,
            headed,
            spawn_driver,
            parallel,
            report,
            no_preflight,
        } => {
            let mut config = Config::load(global.config.as_deref())?;
            apply_overrides(
                &mut config,
                Overrides {
                    base_url,
                    webdriver,
                    browser,
                    headed,
                    spawn_driver,
                    parallel,
                    no_preflight,
                },
            );

            let scenarios = load_selection(&selection)?;
            print_preconditions(&scenarios);

            if config.target.preflight {
                for url in effective_base_urls(&scenarios, &config.target.base_url) {
                    preflight::check_target(&url).await?;
                }
            }

            let driver = spawn::ensure_driver_running(
                &config.webdriver.url,
                config.webdriver.spawn.as_deref(),
                Duration::from_secs(config.timeouts.driver_start_secs),
            )
            .await?;

            let factory = WebDriverFactory::new(&config.webdriver, &config.timeouts);
            tracing::debug!(webdriver = factory.url(), browser = ?config.webdriver.browser, "Using WebDriver");

            let options = RunOptions {
                base_url: config.target.base_url.clone(),
                timeouts: config.timeouts.clone(),
            };
            let verbose = global.verbose;
            let suite = run_suite(&scenarios, &factory, &options, config.runner.parallel, |r| {
                print_scenario(r, verbose)
            })
            .await;

            if let Some(driver) = driver {
                driver.shutdown().await;
            }

            print_summary(&suite);

            if let Some(path) = report {
                suite.write_json(&path)?;
                println!("Report written to {}", path.display());
            }

            if suite.all_passed() {
                Ok(())
            } else {
                Err(Error::ScenariosFailed {
                    failed: suite.failed,
                    total: suite.total,
                })
            }
        }

        Commands::List { selection } => {
            let scenarios = load_selection(&selection)?;
            for loaded in &scenarios {
                let scenario = &loaded.scenario;
                println!(
                    "{} {}",
                    scenario.name.white().bold(),
                    format!(
                        "({} steps, {} assertions)",
                        scenario.steps.len(),
                        scenario.assertions.len()
                    )
                    .dimmed()
                );
                println!("  {}", loaded.path.display().to_string().dimmed());
                if let Some(desc) = &scenario.description {
                    println!("  {}", desc);
                }
            }
            Ok(())
        }

        Commands::Check { selection } => {
            let overrides = parse_var_overrides(&selection.vars)?;
            let vars = Variables::from_env(&overrides);
            let files = discover(&selection.paths)?;

            let mut invalid = 0;
            for path in &files {
                match LoadedScenario::load(path, &vars) {
                    Ok(loaded) => println!(
                        "{} {} {}",
                        "✓".green(),
                        loaded.scenario.name,
                        format!("({})", path.display()).dimmed()
                    ),
                    Err(e) => {
                        invalid += 1;
                        println!("{} {}", "✗".red(), path.display());
                        println!("    {}", e.to_string().red());
                    }
                }
            }

            if invalid == 0 {
                println!("\n{} {} scenarios valid", "✓".green().bold(), files.len());
                Ok(())
            } else {
                Err(Error::Config(format!(
                    "{} of {} scenarios are invalid",
                    invalid,
                    files.len()
                )))
            }
        }
    }
}

/// CLI flags that override the configuration file
#[derive(Debug, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub webdriver: Option<String>,
    pub browser: Option<BrowserKind>,
    pub headed: bool,
    pub spawn_driver: Option<String>,
    pub parallel: Option<usize>,
    pub no_preflight: bool,
}

/// Apply CLI flags on top of the loaded configuration
pub fn apply_overrides(config: &mut Config, overrides: Overrides) {
    if let Some(url) = overrides.base_url {
        config.target.base_url = url;
    }
    if let Some(url) = overrides.webdriver {
        config.webdriver.url = url;
    }
    if let Some(browser) = overrides.browser {
        config.webdriver.browser = browser;
    }
    if overrides.headed {
        config.webdriver.headless = false;
    }
    if let Some(command) = overrides.spawn_driver {
        config.webdriver.spawn = Some(command);
    }
    if let Some(parallel) = overrides.parallel {
        config.runner.parallel = parallel.max(1);
    }
    if overrides.no_preflight {
        config.target.preflight = false;
    }
}

fn load_selection(selection: &Selection) -> Result<Vec<LoadedScenario>> {
    let overrides = parse_var_overrides(&selection.vars)?;
    let vars = Variables::from_env(&overrides);
    let scenarios = crate::scenario::load_all(&selection.paths, &vars)?;
    tracing::debug!(count = scenarios.len(), "Loaded scenarios");
    Ok(scenarios)
}

/// Distinct base URLs the scenarios will talk to
fn effective_base_urls(scenarios: &[LoadedScenario], default: &str) -> BTreeSet<String> {
    scenarios
        .iter()
        .map(|s| s.scenario.base_url.as_deref().unwrap_or(default).to_string())
        .collect()
}

fn print_preconditions(scenarios: &[LoadedScenario]) {
    let preconditions: BTreeSet<&str> = scenarios
        .iter()
        .flat_map(|s| s.scenario.preconditions.iter().map(String::as_str))
        .collect();
    if preconditions.is_empty() {
        return;
    }

    println!("{}", "Preconditions (not checked):".yellow());
    for precondition in preconditions {
        println!("  - {}", precondition);
    }
}
