//! Browser session control
//!
//! A session owns one browser process and one page context. The orchestrator
//! opens a session per document variant through a [`SessionLauncher`], loads
//! the document, and must call [`Session::close`] on every exit path.
//!
//! The traits here are the seam between the harness logic and the browser:
//! [`chrome::ChromeLauncher`] drives a real Chrome via the DevTools protocol,
//! while tests substitute in-memory implementations.

pub mod chrome;

use async_trait::async_trait;
use url::Url;

use crate::error::HarnessResult;
use crate::events::EventSink;

pub use chrome::{ChromeLauncher, ChromePage, ChromeSession};

/// A loaded document that can be inspected and captured
#[async_trait]
pub trait DocumentPage: Send + Sync {
    /// Capture the full scrollable page as PNG bytes
    ///
    /// Fails with [`HarnessError::SessionClosed`](crate::HarnessError::SessionClosed)
    /// once the owning session has been closed.
    async fn screenshot(&self) -> HarnessResult<Vec<u8>>;

    /// Evaluate a JavaScript expression and return its JSON value
    async fn evaluate(&self, expression: &str) -> HarnessResult<serde_json::Value>;
}

/// One browser process with one page context
#[async_trait]
pub trait Session: Send {
    /// Page handle returned by [`Session::load`]
    type Page: DocumentPage;

    /// Navigate to `location` and wait until network activity has quiesced
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Navigation`](crate::HarnessError::Navigation) if
    /// the document cannot be fetched or never becomes idle within the
    /// session's navigation timeout.
    async fn load(&mut self, location: &Url) -> HarnessResult<Self::Page>;

    /// Release the browser process
    ///
    /// Idempotent: calling it again after a successful or failed close is a
    /// no-op.
    async fn close(&mut self) -> HarnessResult<()>;
}

/// Factory for sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Session type produced by this launcher
    type Session: Session;

    /// Start a browser; lifecycle events are delivered to `events`
    async fn open(&self, events: EventSink) -> HarnessResult<Self::Session>;
}
