//! WebDriver server management
//!
//! Checks that the configured WebDriver endpoint is ready, and spawns the
//! configured driver executable when it is not.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::common::{Error, Result};

/// Timeout for a single `/status` probe
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay between readiness probes while a spawned driver starts
const READY_POLL: Duration = Duration::from_millis(100);

/// A driver process started by us; killed when dropped
#[derive(Debug)]
pub struct DriverProcess {
    command: String,
    child: Child,
}

impl DriverProcess {
    /// Stop the driver and wait for it to exit
    pub async fn shutdown(mut self) {
        tracing::debug!(command = %self.command, "Stopping WebDriver");
        if let Err(e) = self.child.kill().await {
            tracing::warn!("Failed to stop {}: {}", self.command, e);
        }
    }
}

/// Whether a `/status` response body reports the driver as ready
///
/// Drivers that omit `value.ready` are treated as ready once they answer.
pub fn status_is_ready(body: &serde_json::Value) -> bool {
    body.get("value")
        .and_then(|v| v.get("ready"))
        .and_then(|r| r.as_bool())
        .unwrap_or(true)
}

/// Probe `GET {url}/status`
pub async fn driver_ready(http: &reqwest::Client, url: &str) -> bool {
    let status_url = format!("{}/status", url.trim_end_matches('/'));
    let response = match http.get(&status_url).timeout(STATUS_TIMEOUT).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            tracing::debug!(status = %response.status(), "WebDriver status probe failed");
            return false;
        }
        Err(e) => {
            tracing::debug!("WebDriver not reachable at {}: {}", status_url, e);
            return false;
        }
    };

    match response.json::<serde_json::Value>().await {
        Ok(body) => status_is_ready(&body),
        Err(_) => false,
    }
}

/// Port the driver should listen on, from the WebDriver URL
fn driver_port(url: &str) -> Result<u16> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::Config(format!("Invalid WebDriver URL '{}': {}", url, e)))?;
    parsed
        .port_or_known_default()
        .ok_or_else(|| Error::Config(format!("WebDriver URL '{}' has no port", url)))
}

/// Command-line arguments that make the driver listen on `port`
pub fn driver_args(command: &Path, port: u16) -> Vec<String> {
    let is_gecko = command
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.contains("gecko"))
        .unwrap_or(false);

    if is_gecko {
        vec!["--port".to_string(), port.to_string()]
    } else {
        vec![format!("--port={}", port)]
    }
}

/// Ensure a WebDriver server is ready at `url`
///
/// Returns the spawned process when one had to be started. `spawn` is the
/// driver command to start if nothing answers; without it an unreachable
/// endpoint is an error.
pub async fn ensure_driver_running(
    url: &str,
    spawn: Option<&str>,
    start_timeout: Duration,
) -> Result<Option<DriverProcess>> {
    let http = reqwest::Client::new();

    if driver_ready(&http, url).await {
        tracing::debug!(url, "WebDriver already running");
        return Ok(None);
    }

    let Some(command) = spawn else {
        return Err(Error::DriverNotRunning {
            url: url.to_string(),
        });
    };

    let exe = which::which(command).map_err(|_| Error::DriverNotFound(command.to_string()))?;
    let args = driver_args(&exe, driver_port(url)?);
    tracing::info!(command = %exe.display(), ?args, "Spawning WebDriver");

    let child = Command::new(&exe)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Internal(format!("Failed to spawn {}: {}", command, e)))?;
    let mut process = DriverProcess {
        command: command.to_string(),
        child,
    };

    // Wait for the driver to start answering
    let deadline = tokio::time::Instant::now() + start_timeout;
    loop {
        if driver_ready(&http, url).await {
            tracing::debug!("WebDriver started successfully");
            return Ok(Some(process));
        }

        if let Ok(Some(status)) = process.child.try_wait() {
            return Err(Error::Internal(format!(
                "{} exited during startup ({})",
                command, status
            )));
        }

        if tokio::time::Instant::now() >= deadline {
            process.shutdown().await;
            return Err(Error::DriverSpawnTimeout {
                command: command.to_string(),
                secs: start_timeout.as_secs(),
            });
        }

        tokio::time::sleep(READY_POLL).await;
    }
}
