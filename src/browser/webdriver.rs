//! WebDriver-backed browser sessions
//!
//! Every [`WebDriverFactory::open`] creates a new WebDriver session, which the
//! driver backs with a fresh browser profile: cookies and storage never leak
//! between scenario runs.

use std::time::Duration;

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{Client, ClientBuilder, Locator as WdLocator};
use serde_json::{json, Map, Value};

use super::{BrowserSession, Interaction, SessionFactory, Visibility};
use crate::common::config::{BrowserKind, Timeouts, WebDriverConfig};
use crate::common::{Error, Result};
use crate::scenario::{Locator, Query};

/// Opens sessions against a WebDriver server
pub struct WebDriverFactory {
    url: String,
    capabilities: Map<String, Value>,
    start_timeout: Duration,
    page_load_ms: u64,
}

impl WebDriverFactory {
    pub fn new(config: &WebDriverConfig, timeouts: &Timeouts) -> Self {
        Self {
            url: config.url.clone(),
            capabilities: capabilities(config, timeouts),
            start_timeout: Duration::from_secs(timeouts.session_start_secs),
            page_load_ms: timeouts.navigation_ms,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Build the W3C capabilities requested for each new session
///
/// The driver enforces the page load and script timeouts itself, so an
/// abandoned navigation stops loading instead of blocking the session's
/// later commands (including its deletion).
pub fn capabilities(config: &WebDriverConfig, timeouts: &Timeouts) -> Map<String, Value> {
    let [width, height] = config.window_size;
    let mut caps = Map::new();
    caps.insert(
        "browserName".to_string(),
        json!(config.browser.capability_name()),
    );
    caps.insert(
        "pageLoadStrategy".to_string(),
        json!(config.page_load_strategy.as_str()),
    );
    caps.insert(
        "timeouts".to_string(),
        json!({
            "pageLoad": timeouts.navigation_ms,
            "script": timeouts.action_ms,
            "implicit": 0,
        }),
    );

    match config.browser {
        BrowserKind::Chrome => {
            let mut args = vec![
                format!("--window-size={},{}", width, height),
                "--disable-dev-shm-usage".to_string(),
            ];
            if config.headless {
                args.push("--headless=new".to_string());
            }
            args.extend(config.args.iter().cloned());
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
        BrowserKind::Firefox => {
            let mut args = vec![format!("--width={}", width), format!("--height={}", height)];
            if config.headless {
                args.push("-headless".to_string());
            }
            args.extend(config.args.iter().cloned());
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
        }
    }

    caps
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>> {
        let mut builder =
            ClientBuilder::rustls().map_err(|e| Error::SessionStart(e.to_string()))?;
        builder.capabilities(self.capabilities.clone());

        tracing::debug!(url = %self.url, "Requesting new WebDriver session");
        let client = tokio::time::timeout(self.start_timeout, builder.connect(&self.url))
            .await
            .map_err(|_| {
                Error::SessionStart(format!(
                    "no session from {} after {} seconds",
                    self.url,
                    self.start_timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::SessionStart(e.to_string()))?;

        Ok(Box::new(WebDriverSession {
            client,
            page_load_ms: self.page_load_ms,
        }))
    }
}

/// A live WebDriver session
pub struct WebDriverSession {
    client: Client,
    page_load_ms: u64,
}

fn status(e: &CmdError) -> Option<&ErrorStatus> {
    match e {
        CmdError::Standard(wd) => Some(&wd.error),
        _ => None,
    }
}

/// Errors worth retrying: the element went stale, is hidden or is covered
fn is_transient(e: &CmdError) -> bool {
    matches!(
        status(e),
        Some(
            ErrorStatus::StaleElementReference
                | ErrorStatus::ElementNotInteractable
                | ErrorStatus::ElementClickIntercepted
        )
    )
}

fn driver_error(e: CmdError) -> Error {
    Error::Driver(e.to_string())
}

impl WebDriverSession {
    async fn find_nth(&self, locator: &Locator) -> Result<Option<Element>> {
        let query = locator.to_query();
        let found = match &query {
            Query::XPath(xpath) => self.client.find_all(WdLocator::XPath(xpath)).await,
            Query::Css(css) => self.client.find_all(WdLocator::Css(css)).await,
        };

        match found {
            Ok(elements) => Ok(elements.into_iter().nth(locator.nth)),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(driver_error(e)),
        }
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        match self.client.goto(url).await {
            Ok(()) => Ok(()),
            Err(e) if matches!(status(&e), Some(ErrorStatus::Timeout)) => {
                Err(Error::NavigationTimeout {
                    url: url.to_string(),
                    ms: self.page_load_ms,
                })
            }
            Err(e) => Err(driver_error(e)),
        }
    }

    async fn ready_state(&mut self) -> Result<String> {
        let value = self
            .client
            .execute("return document.readyState;", Vec::new())
            .await
            .map_err(driver_error)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn visibility(&mut self, locator: &Locator) -> Result<Visibility> {
        let Some(element) = self.find_nth(locator).await? else {
            return Ok(Visibility::Missing);
        };
        match element.is_displayed().await {
            Ok(true) => Ok(Visibility::Visible),
            Ok(false) => Ok(Visibility::Hidden),
            // Re-rendered between lookup and query
            Err(e) if is_transient(&e) => Ok(Visibility::Stale),
            Err(e) => Err(driver_error(e)),
        }
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> Result<Interaction> {
        let Some(element) = self.find_nth(locator).await? else {
            return Ok(Interaction::Missing);
        };
        let attempt = async {
            element.clear().await?;
            element.send_keys(value).await
        };
        match attempt.await {
            Ok(_) => Ok(Interaction::Done),
            Err(e) if is_transient(&e) => Ok(Interaction::NotReady(e.to_string())),
            Err(e) => Err(driver_error(e)),
        }
    }

    async fn click(&mut self, locator: &Locator) -> Result<Interaction> {
        let Some(element) = self.find_nth(locator).await? else {
            return Ok(Interaction::Missing);
        };
        match element.click().await {
            Ok(_) => Ok(Interaction::Done),
            Err(e) if is_transient(&e) => Ok(Interaction::NotReady(e.to_string())),
            Err(e) => Err(driver_error(e)),
        }
    }

    async fn current_url(&mut self) -> Result<String> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(driver_error)
    }

    async fn close(&mut self) -> Result<()> {
        self.client.clone().close().await.map_err(driver_error)
    }
}
