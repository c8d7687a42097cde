//! Browser session seam
//!
//! The runner talks to the browser only through [`BrowserSession`], one
//! isolated session per scenario run. [`webdriver`] implements it on top of a
//! W3C WebDriver server; tests plug in an in-process fake.

pub mod webdriver;

use async_trait::async_trait;

use crate::common::Result;
use crate::scenario::Locator;

pub use webdriver::WebDriverFactory;

/// Display state of a located element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    /// Present in the document but not displayed
    Hidden,
    /// No nth match
    Missing,
    /// The match changed while being inspected (e.g. re-rendered); no
    /// verdict, ask again
    Stale,
}

/// Result of a single fill/click attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Done,
    /// No nth match yet
    Missing,
    /// Matched, but the browser refused the action (hidden, covered, stale...)
    NotReady(String),
}

/// One isolated browser context (own cookies and storage)
///
/// Methods report a single attempt; polling and timeouts are the runner's job.
/// `Err` is reserved for failures that retrying cannot fix, such as a lost
/// driver connection.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load a URL in the current tab
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Current `document.readyState`
    async fn ready_state(&mut self) -> Result<String>;

    /// Display state of the locator's nth match
    async fn visibility(&mut self, locator: &Locator) -> Result<Visibility>;

    /// Replace the value of the locator's nth match
    async fn fill(&mut self, locator: &Locator, value: &str) -> Result<Interaction>;

    /// Click the locator's nth match
    async fn click(&mut self, locator: &Locator) -> Result<Interaction>;

    /// URL of the current page, for diagnostics
    async fn current_url(&mut self) -> Result<String>;

    /// Destroy the session and everything it owns
    async fn close(&mut self) -> Result<()>;
}

/// Creates fresh, isolated sessions
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>>;
}

/// Scoped ownership of an open session
///
/// `close` consumes the guard, so a session is torn down at most once.
/// Dropping an unclosed guard logs a warning.
pub struct Session {
    inner: Box<dyn BrowserSession>,
    closed: bool,
}

impl Session {
    pub async fn open(factory: &dyn SessionFactory) -> Result<Self> {
        let inner = factory.open().await?;
        tracing::debug!("Browser session opened");
        Ok(Self {
            inner,
            closed: false,
        })
    }

    pub fn driver(&mut self) -> &mut dyn BrowserSession {
        &mut *self.inner
    }

    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        let result = self.inner.close().await;
        match &result {
            Ok(()) => tracing::debug!("Browser session closed"),
            Err(e) => tracing::warn!("Browser session teardown failed: {}", e),
        }
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("Browser session dropped without teardown");
        }
    }
}
