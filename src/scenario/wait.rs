//! Bounded polling
//!
//! Page state changes asynchronously, so every step and assertion retries a
//! probe until it succeeds or a deadline passes.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Deadline-bounded retry loop state
///
/// ```ignore
/// let mut poller = Poller::new(timeout, interval);
/// loop {
///     if let Some(Ok(true)) = poller.probe(session.is_ready()).await {
///         break;
///     }
///     if !poller.tick().await {
///         return Err(timeout_error);
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Poller {
    deadline: Instant,
    interval: Duration,
    attempts: u32,
}

/// Stand-in deadline for timeouts too large to represent
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

impl Poller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            deadline: now.checked_add(timeout).unwrap_or(now + FAR_FUTURE),
            interval,
            attempts: 0,
        }
    }

    /// Time left before the deadline
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Number of probes started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run one probe, bounded by the remaining time
    ///
    /// Returns `None` if the probe itself outlived the deadline. The first
    /// probe always runs, even with a zero timeout.
    pub async fn probe<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        self.attempts += 1;
        let budget = self.remaining().max(Duration::from_millis(1));
        tokio::time::timeout(budget, fut).await.ok()
    }

    /// Sleep until the next attempt
    ///
    /// Returns false once the deadline has passed, meaning the caller should
    /// stop retrying.
    pub async fn tick(&mut self) -> bool {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return false;
        }
        tokio::time::sleep(self.interval.min(remaining)).await;
        true
    }
}
