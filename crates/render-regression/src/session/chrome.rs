//! Chrome session via chromiumoxide
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ChromeSession                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  Browser process ── handler task (CDP message pump)      │
//! │  Page ──┬── __pagedLifecycle binding ──┐                 │
//! │         └── console errors ────────────┴──▶ EventSink    │
//! │  Profile directory (removed on close)                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The window is launched without viewport emulation so that the page is laid
//! out at the size of a real browser window.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, EventFrameNavigated,
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    AddBindingParams, ConsoleApiCalledType, EventBindingCalled, EventConsoleApiCalled,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::{FutureExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{DocumentPage, Session, SessionLauncher};
use crate::config::BrowserOptions;
use crate::error::{HarnessError, HarnessResult};
use crate::events::{EventSink, PaginationEvent, LIFECYCLE_BINDING, LIFECYCLE_OBSERVER_SCRIPT};

const NETWORK_IDLE: &str = "networkIdle";

/// Launches Chrome sessions
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    options: BrowserOptions,
    navigation_timeout: Duration,
}

impl ChromeLauncher {
    /// Create a launcher
    ///
    /// # Arguments
    ///
    /// * `options` - Window and process options
    /// * `navigation_timeout` - Deadline for a document to load and go idle
    pub fn new(options: BrowserOptions, navigation_timeout: Duration) -> Self {
        Self {
            options,
            navigation_timeout,
        }
    }

    fn browser_config(&self, profile: &TempDir) -> HarnessResult<BrowserConfig> {
        let options = &self.options;
        let mut builder = BrowserConfig::builder()
            .window_size(options.window_width, options.window_height)
            .viewport(None::<Viewport>)
            .user_data_dir(profile.path())
            .request_timeout(self.navigation_timeout);

        if !options.headless {
            builder = builder.with_head();
        }
        if options.maximized {
            builder = builder.arg("--start-maximized");
        }
        if options.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }
        for arg in &options.args {
            builder = builder.arg(arg.clone());
        }

        builder.build().map_err(HarnessError::Launch)
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    #[instrument(skip(self, events), fields(headless = self.options.headless))]
    async fn open(&self, events: EventSink) -> HarnessResult<ChromeSession> {
        let profile = tempfile::Builder::new()
            .prefix("render-regression-")
            .tempdir()?;
        let config = self.browser_config(&profile)?;

        info!("Launching browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarnessError::Launch(e.to_string()))?;

        // Spawn handler to process browser events
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        info!("Browser launched successfully");
        Ok(ChromeSession {
            browser: Some(browser),
            handler: Some(handler_task),
            page: None,
            listeners: Vec::new(),
            closed: Arc::new(AtomicBool::new(false)),
            events,
            navigation_timeout: self.navigation_timeout,
            profile: Some(profile),
        })
    }
}

/// A running Chrome process with a single page context
pub struct ChromeSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Option<Page>,
    listeners: Vec<JoinHandle<()>>,
    closed: Arc<AtomicBool>,
    events: EventSink,
    navigation_timeout: Duration,
    profile: Option<TempDir>,
}

impl ChromeSession {
    fn ensure_open(&self) -> HarnessResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HarnessError::SessionClosed);
        }
        Ok(())
    }

    /// Return the session's page, creating and instrumenting it on first use
    async fn ensure_page(&mut self) -> HarnessResult<Page> {
        if let Some(page) = &self.page {
            return Ok(page.clone());
        }

        let browser = self.browser.as_ref().ok_or(HarnessError::SessionClosed)?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarnessError::Launch(format!("Failed to create page: {}", e)))?;

        // close() must see the page even if instrumentation fails
        self.page = Some(page.clone());
        self.instrument_page(&page).await?;
        Ok(page)
    }

    /// Install the lifecycle observer and forward its events to the sink
    async fn instrument_page(&mut self, page: &Page) -> HarnessResult<()> {
        let setup = |e: chromiumoxide::error::CdpError| {
            HarnessError::Launch(format!("Failed to instrument page: {}", e))
        };

        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(setup)?;
        page.execute(AddBindingParams::new(LIFECYCLE_BINDING))
            .await
            .map_err(setup)?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            LIFECYCLE_OBSERVER_SCRIPT,
        ))
        .await
        .map_err(setup)?;

        let mut bindings = page
            .event_listener::<EventBindingCalled>()
            .await
            .map_err(setup)?;
        let sink = self.events.clone();
        self.listeners.push(tokio::spawn(async move {
            while let Some(call) = bindings.next().await {
                if call.name != LIFECYCLE_BINDING {
                    continue;
                }
                if let Some(event) = PaginationEvent::from_binding_payload(&call.payload) {
                    sink.record(event).await;
                }
            }
        }));

        let mut console = page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(setup)?;
        let sink = self.events.clone();
        self.listeners.push(tokio::spawn(async move {
            while let Some(call) = console.next().await {
                if call.r#type != ConsoleApiCalledType::Error {
                    continue;
                }
                let message = call
                    .args
                    .first()
                    .and_then(|arg| arg.value.as_ref())
                    .and_then(|value| value.as_str());
                let element = call.args.get(1).and_then(|arg| arg.description.as_deref());
                if let Some(event) = PaginationEvent::from_console_error(message, element) {
                    warn!("Pagination engine reported a layout loop at {:?}", element);
                    sink.record(event).await;
                }
            }
        }));

        debug!("Lifecycle observer installed");
        Ok(())
    }
}

#[async_trait]
impl Session for ChromeSession {
    type Page = ChromePage;

    #[instrument(skip(self, location), fields(location = %location))]
    async fn load(&mut self, location: &Url) -> HarnessResult<ChromePage> {
        self.ensure_open()?;
        let page = self.ensure_page().await?;
        let deadline = Instant::now() + self.navigation_timeout;
        let failed = |reason: String| HarnessError::navigation(location.as_str(), reason);

        let mut navigated = page
            .event_listener::<EventFrameNavigated>()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| failed(e.to_string()))?;

        debug!("Navigating to: {}", location);
        match timeout_at(deadline, page.goto(location.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(failed(e.to_string())),
            Err(_) => {
                return Err(failed(format!(
                    "page did not load within {:?}",
                    self.navigation_timeout
                )))
            }
        }

        // The most recent main-frame commit is the navigation we just made
        let mut loader = None;
        while let Some(Some(event)) = navigated.next().now_or_never() {
            if event.frame.parent_id.is_none() {
                loader = Some(event.frame.loader_id.clone());
            }
        }

        let idle = async {
            while let Some(event) = lifecycle.next().await {
                let current = loader.as_ref().map_or(true, |id| *id == event.loader_id);
                if event.name == NETWORK_IDLE && current {
                    return true;
                }
            }
            false
        };
        match timeout_at(deadline, idle).await {
            Ok(true) => {
                info!("Loaded {} (network idle)", location);
                Ok(ChromePage {
                    page,
                    closed: Arc::clone(&self.closed),
                })
            }
            Ok(false) => Err(failed("lifecycle event stream ended".to_string())),
            Err(_) => Err(failed(format!(
                "network did not become idle within {:?}",
                self.navigation_timeout
            ))),
        }
    }

    async fn close(&mut self) -> HarnessResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Session already closed");
            return Ok(());
        }

        for listener in self.listeners.drain(..) {
            listener.abort();
        }

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Graceful browser shutdown failed, killing process: {}", e);
                if let Some(Err(e)) = browser.kill().await {
                    warn!("Failed to kill browser process: {}", e);
                }
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to reap browser process: {}", e);
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        self.profile.take();

        info!("Browser closed");
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            warn!("Browser session dropped without close; aborting background tasks");
            for listener in self.listeners.drain(..) {
                listener.abort();
            }
            if let Some(handler) = self.handler.take() {
                handler.abort();
            }
        }
    }
}

/// Handle to the page of an open [`ChromeSession`]
#[derive(Clone)]
pub struct ChromePage {
    page: Page,
    closed: Arc<AtomicBool>,
}

impl ChromePage {
    fn ensure_open(&self) -> HarnessResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HarnessError::SessionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentPage for ChromePage {
    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        self.ensure_open()?;
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| HarnessError::Capture(e.to_string()))
    }

    async fn evaluate(&self, expression: &str) -> HarnessResult<serde_json::Value> {
        self.ensure_open()?;
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| HarnessError::Extraction(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}
