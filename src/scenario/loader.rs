//! Scenario discovery, parsing, and variable interpolation

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

use super::config::{Scenario, Step};

/// Prefix for environment variables that override scenario `vars`
pub const ENV_VAR_PREFIX: &str = "GATECHECK_VAR_";

/// A parsed scenario together with the file it came from
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    pub path: PathBuf,
    pub scenario: Scenario,
}

/// Where `${name}` values come from
///
/// Precedence, highest first: explicit overrides (`--var`), the environment
/// (`GATECHECK_VAR_<NAME>`), the scenario's own `vars`.
pub struct Variables<'a> {
    overrides: &'a BTreeMap<String, String>,
    env: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> Variables<'a> {
    /// Overrides plus the process environment
    pub fn from_env(overrides: &'a BTreeMap<String, String>) -> Self {
        Self {
            overrides,
            env: Box::new(|name: &str| {
                std::env::var(format!("{}{}", ENV_VAR_PREFIX, name.to_uppercase())).ok()
            }),
        }
    }

    /// Overrides plus a custom environment lookup
    pub fn with_env(
        overrides: &'a BTreeMap<String, String>,
        env: impl Fn(&str) -> Option<String> + 'a,
    ) -> Self {
        Self {
            overrides,
            env: Box::new(env),
        }
    }

    fn lookup(&self, name: &str, scenario_vars: &BTreeMap<String, String>) -> Option<String> {
        self.overrides
            .get(name)
            .cloned()
            .or_else(|| (self.env)(name))
            .or_else(|| scenario_vars.get(name).cloned())
    }
}

/// Parse `key=value` pairs given on the command line
pub fn parse_var_overrides(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::Config(format!("Invalid --var '{}': expected name=value", pair))
            })?;
            let key = key.trim();
            if key.is_empty() || !key.chars().all(is_var_char) {
                return Err(Error::Config(format!(
                    "Invalid --var name '{}': use letters, digits and '_'",
                    key
                )));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

fn is_var_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replace every `${name}` in `text`
///
/// A `$` not followed by `{` is kept literally.
pub fn interpolate(text: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::Config(format!("Unterminated '${{' in '{}'", text)))?;
        let name = &after[..end];
        if name.is_empty() || !name.chars().all(is_var_char) {
            return Err(Error::Config(format!(
                "Invalid variable name '{}' in '{}'",
                name, text
            )));
        }
        let value = lookup(name).ok_or_else(|| Error::unresolved_variable(name))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

impl LoadedScenario {
    /// Read and parse a scenario file, resolving its variables
    pub fn load(path: &Path, vars: &Variables<'_>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(path, &content, vars)
    }

    /// Parse scenario text; `path` is used for error messages and the report
    pub fn parse(path: &Path, content: &str, vars: &Variables<'_>) -> Result<Self> {
        let mut scenario: Scenario = serde_yaml::from_str(content)
            .map_err(|e| Error::scenario_parse(path, e.to_string()))?;

        if scenario.name.trim().is_empty() {
            return Err(Error::scenario_parse(path, "'name' must not be empty"));
        }
        if scenario.steps.is_empty() && scenario.assertions.is_empty() {
            return Err(Error::scenario_parse(
                path,
                "scenario has neither steps nor assertions",
            ));
        }

        let scenario_vars = scenario.vars.clone();
        let lookup = |name: &str| vars.lookup(name, &scenario_vars);
        let wrap = |e: Error| match e {
            Error::UnresolvedVariable { .. } => e,
            other => Error::scenario_parse(path, other.to_string()),
        };

        for step in &mut scenario.steps {
            match step {
                Step::Navigate { path: target, .. } => {
                    *target = interpolate(target.as_str(), lookup).map_err(wrap)?;
                }
                Step::Fill { value, .. } => {
                    *value = interpolate(value.as_str(), lookup).map_err(wrap)?;
                }
                Step::Click { .. }
                | Step::WaitFor { .. }
                | Step::Wait { .. }
                | Step::WaitForLoadState { .. } => {}
            }
        }
        if let Some(base_url) = &scenario.base_url {
            scenario.base_url = Some(interpolate(base_url, lookup).map_err(wrap)?);
        }

        Ok(Self {
            path: path.to_path_buf(),
            scenario,
        })
    }
}

fn is_scenario_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Expand files and directories into an ordered list of scenario files
///
/// Directories contribute their `*.yaml` / `*.yml` entries (not recursive),
/// sorted by file name. Explicit files are kept in the given order.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_scenario_file(p))
                .collect();
            if entries.is_empty() {
                return Err(Error::NoScenarios(path.display().to_string()));
            }
            entries.sort();
            files.extend(entries);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(Error::FileRead {
                path: path.display().to_string(),
                error: "no such file or directory".to_string(),
            });
        }
    }

    Ok(files)
}

/// Discover and load every scenario under `paths`
pub fn load_all(paths: &[PathBuf], vars: &Variables<'_>) -> Result<Vec<LoadedScenario>> {
    discover(paths)?
        .iter()
        .map(|path| LoadedScenario::load(path, vars))
        .collect()
}
