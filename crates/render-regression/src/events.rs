//! Pagination engine lifecycle events
//!
//! The browser session reports what the pagination engine did while a
//! document was loading: the `before` hook, every laid-out page, the final
//! `rendered` notification, and any layout-loop diagnostics. Events are
//! delivered to an [`EventSink`] owned by the orchestrator, one sink per
//! variant, so nothing leaks between runs.
//!
//! # How it works
//!
//! 1. Before any document script runs, the session installs
//!    [`LIFECYCLE_OBSERVER_SCRIPT`], which waits for `window.PagedPolyfill`
//!    and registers handlers on its `before`, `page` and `rendered` events
//! 2. Each handler calls the `__pagedLifecycle` CDP binding with a JSON payload
//! 3. The session parses payloads with [`PaginationEvent::from_binding_payload`]
//! 4. Loop diagnostics are read from CDP console events without touching the
//!    page's `console` object ([`PaginationEvent::from_console_error`])

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;
use tracing::{debug, trace};

/// Name of the CDP binding the observer script reports through
pub const LIFECYCLE_BINDING: &str = "__pagedLifecycle";

/// First console argument of the engine's layout-loop diagnostic
pub const LAYOUT_REPEATED_DIAGNOSTIC: &str = "Layout repeated at: ";

/// Observer installed on every new document.
///
/// Polls for the engine for at most 60 seconds; documents without a
/// pagination engine produce no events.
pub const LIFECYCLE_OBSERVER_SCRIPT: &str = r#"
(function() {
    'use strict';
    if (window.__pagedLifecycleObserver) return;
    window.__pagedLifecycleObserver = true;

    function emit(kind, detail) {
        var binding = window.__pagedLifecycle;
        if (typeof binding !== 'function') return;
        var payload = { kind: kind };
        for (var key in (detail || {})) payload[key] = detail[key];
        try { binding(JSON.stringify(payload)); } catch (e) {}
    }

    var attempts = 0;
    function attach() {
        var engine = window.PagedPolyfill;
        if (!engine || typeof engine.on !== 'function') {
            if (++attempts < 600) setTimeout(attach, 100);
            return;
        }
        engine.on('before', function() { emit('before_layout'); });
        engine.on('page', function(page) {
            emit('page', { position: page && typeof page.position === 'number' ? page.position : null });
        });
        engine.on('rendered', function(flow) {
            emit('rendered', { pages: flow && typeof flow.total === 'number' ? flow.total : null });
        });
    }
    attach();
})();
"#;

/// A lifecycle event observed from the pagination engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaginationEvent {
    /// The engine is about to lay out the document
    BeforeLayout,
    /// A page was laid out
    Page {
        /// Zero-based page position, when the engine reports one
        #[serde(default)]
        position: Option<u32>,
    },
    /// Layout finished
    Rendered {
        /// Total number of pages, when the engine reports it
        #[serde(default)]
        pages: Option<u32>,
    },
    /// The engine detected a non-terminating layout loop
    LayoutRepeated {
        /// Description of the offending element, e.g. `div#ex-inline-479`
        #[serde(default)]
        element: Option<String>,
    },
}

impl PaginationEvent {
    /// Parse a payload sent through [`LIFECYCLE_BINDING`]
    pub fn from_binding_payload(payload: &str) -> Option<Self> {
        match serde_json::from_str(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!("Ignoring malformed lifecycle payload {:?}: {}", payload, e);
                None
            }
        }
    }

    /// Recognise the engine's layout-loop diagnostic in a console error
    ///
    /// `message` is the first console argument, `element` the description of
    /// the second one.
    pub fn from_console_error(message: Option<&str>, element: Option<&str>) -> Option<Self> {
        if message != Some(LAYOUT_REPEATED_DIAGNOSTIC) {
            return None;
        }
        Some(PaginationEvent::LayoutRepeated {
            element: element.map(str::to_string),
        })
    }
}

/// Aggregated view of the events seen for one variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// The `before` hook fired
    pub before_layout: bool,
    /// Number of `page` events
    pub pages_laid_out: usize,
    /// The `rendered` event fired
    pub rendered: bool,
    /// Page total reported with `rendered`
    pub rendered_pages: Option<u32>,
    /// Elements named by layout-loop diagnostics, in order
    pub layout_loops: Vec<String>,
}

impl EventSummary {
    /// Summarize a sequence of events
    pub fn from_events(events: &[PaginationEvent]) -> Self {
        let mut summary = Self::default();
        for event in events {
            match event {
                PaginationEvent::BeforeLayout => summary.before_layout = true,
                PaginationEvent::Page { .. } => summary.pages_laid_out += 1,
                PaginationEvent::Rendered { pages } => {
                    summary.rendered = true;
                    summary.rendered_pages = *pages;
                }
                PaginationEvent::LayoutRepeated { element } => summary
                    .layout_loops
                    .push(element.clone().unwrap_or_else(|| "<unknown>".to_string())),
            }
        }
        summary
    }

    /// Whether any layout-loop diagnostic was observed
    pub fn layout_loop_detected(&self) -> bool {
        !self.layout_loops.is_empty()
    }
}

/// Collector for pagination events
///
/// Cheap to clone; all clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    inner: Arc<SinkInner>,
}

#[derive(Debug, Default)]
struct SinkInner {
    events: Mutex<Vec<PaginationEvent>>,
    notify: Notify,
}

impl EventSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and wake anyone waiting on the sink
    pub async fn record(&self, event: PaginationEvent) {
        trace!("Pagination event: {:?}", event);
        self.inner.events.lock().await.push(event);
        self.inner.notify.notify_waiters();
    }

    /// All events recorded so far
    pub async fn events(&self) -> Vec<PaginationEvent> {
        self.inner.events.lock().await.clone()
    }

    /// Summary of the events recorded so far
    pub async fn summary(&self) -> EventSummary {
        EventSummary::from_events(&self.inner.events.lock().await)
    }

    /// Wait until the engine reports `rendered`, for at most `limit`
    ///
    /// Returns `true` if the event was seen.
    pub async fn wait_for_layout_complete(&self, limit: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.inner.notify.notified();
                if self.has_rendered().await {
                    return;
                }
                notified.await;
            }
        };
        timeout(limit, wait).await.is_ok()
    }

    async fn has_rendered(&self) -> bool {
        self.inner
            .events
            .lock()
            .await
            .iter()
            .any(|e| matches!(e, PaginationEvent::Rendered { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding_payloads() {
        assert_eq!(
            PaginationEvent::from_binding_payload(r#"{"kind":"before_layout"}"#),
            Some(PaginationEvent::BeforeLayout)
        );
        assert_eq!(
            PaginationEvent::from_binding_payload(r#"{"kind":"page","position":3}"#),
            Some(PaginationEvent::Page { position: Some(3) })
        );
        assert_eq!(
            PaginationEvent::from_binding_payload(r#"{"kind":"rendered","pages":null}"#),
            Some(PaginationEvent::Rendered { pages: None })
        );
    }

    #[test]
    fn test_malformed_payload_is_ignored() {
        assert_eq!(PaginationEvent::from_binding_payload("not json"), None);
        assert_eq!(
            PaginationEvent::from_binding_payload(r#"{"kind":"unknown"}"#),
            None
        );
    }

    #[test]
    fn test_layout_loop_diagnostic_requires_exact_message() {
        assert_eq!(
            PaginationEvent::from_console_error(
                Some("Layout repeated at: "),
                Some("div#ex-inline-479")
            ),
            Some(PaginationEvent::LayoutRepeated {
                element: Some("div#ex-inline-479".to_string())
            })
        );
        assert_eq!(
            PaginationEvent::from_console_error(Some("Layout repeated"), Some("div")),
            None
        );
        assert_eq!(PaginationEvent::from_console_error(None, None), None);
    }

    #[test]
    fn test_summary_counts_events() {
        let summary = EventSummary::from_events(&[
            PaginationEvent::BeforeLayout,
            PaginationEvent::Page { position: Some(0) },
            PaginationEvent::Page { position: Some(1) },
            PaginationEvent::LayoutRepeated { element: None },
            PaginationEvent::Rendered { pages: Some(2) },
        ]);
        assert!(summary.before_layout);
        assert_eq!(summary.pages_laid_out, 2);
        assert!(summary.rendered);
        assert_eq!(summary.rendered_pages, Some(2));
        assert_eq!(summary.layout_loops, vec!["<unknown>".to_string()]);
        assert!(summary.layout_loop_detected());
    }

    #[tokio::test]
    async fn test_wait_for_layout_complete_wakes_on_rendered() {
        let sink = EventSink::new();
        let producer = sink.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.record(PaginationEvent::Page { position: Some(0) }).await;
            producer.record(PaginationEvent::Rendered { pages: Some(1) }).await;
        });

        assert!(sink.wait_for_layout_complete(Duration::from_secs(5)).await);
        task.await.unwrap();
        assert_eq!(sink.events().await.len(), 2);
    }

    #[tokio::test]
    async fn test_wait_for_layout_complete_times_out() {
        let sink = EventSink::new();
        sink.record(PaginationEvent::BeforeLayout).await;
        assert!(!sink.wait_for_layout_complete(Duration::from_millis(30)).await);
    }

    #[tokio::test]
    async fn test_clones_share_buffer() {
        let sink = EventSink::new();
        sink.clone().record(PaginationEvent::BeforeLayout).await;
        assert!(sink.summary().await.before_layout);
    }
}
