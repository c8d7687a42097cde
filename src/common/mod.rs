//! Common utilities shared by the CLI and the runner

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, FailureReason, Result};

/// Join a scenario path onto a base URL
///
/// Absolute URLs are returned unchanged; anything else is resolved against
/// `base` the way a browser resolves an href.
pub fn join_url(base: &str, path: &str) -> Result<String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }
    let base = reqwest::Url::parse(base)
        .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base, e)))?;
    base.join(path)
        .map(|url| url.to_string())
        .map_err(|e| Error::Config(format!("Cannot join '{}' onto '{}': {}", path, base, e)))
}
