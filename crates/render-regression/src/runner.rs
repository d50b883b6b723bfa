//! Test orchestration
//!
//! The runner drives one browser session per document variant, strictly in
//! sequence, and assembles the results the reporters project.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  for each variant:                                               │
//! │    open ─▶ load ─▶ initial snapshot ─▶ settle ─▶ final snapshot  │
//! │         ─▶ extract after marker ─▶ event summary ─▶ close        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session is closed exactly once per variant on every path. A variant
//! that fails is recorded as [`VariantOutcome::Failed`] and the run moves on.
//!
//! # Example
//!
//! ```no_run
//! use render_regression::{Config, HarnessRunner};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_file("regression.toml")?;
//! let runner = HarnessRunner::chrome(&config);
//! let results = runner.run(&config.document_variants()).await?;
//!
//! for comparison in &results.comparisons {
//!     println!("{} vs {}: {:?}", comparison.candidate, comparison.baseline, comparison.verdict());
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::classify::{compare_outcomes, Comparison};
use crate::config::{Config, HarnessConfig, SettleStrategy};
use crate::error::{HarnessError, HarnessResult};
use crate::events::{EventSink, EventSummary};
use crate::extract::{extract_content_after_marker, ExtractOptions, Extraction};
use crate::session::{ChromeLauncher, Session, SessionLauncher};
use crate::snapshot::{capture, Phase, Snapshot};

/// A document under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVariant {
    /// Short name such as `original` or `patched`
    pub label: String,
    /// Path of the HTML document
    pub path: PathBuf,
}

impl DocumentVariant {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// The document as a `file://` URL
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Navigation`] if the file does not exist.
    pub async fn location(&self) -> HarnessResult<Url> {
        let shown = self.path.display().to_string();
        let canonical = tokio::fs::canonicalize(&self.path)
            .await
            .map_err(|e| HarnessError::navigation(shown.clone(), e))?;
        Url::from_file_path(&canonical)
            .map_err(|_| HarnessError::navigation(shown, "path is not representable as a file URL"))
    }
}

/// Everything observed for one variant that ran to completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult {
    pub label: String,
    /// URL the document was loaded from
    pub location: String,
    /// Content found after the marker in the final state
    pub extraction: Extraction,
    /// Snapshot taken right after load
    pub initial: Snapshot,
    /// Snapshot taken after the settle interval
    pub final_snapshot: Snapshot,
    /// Pagination events seen while the variant was open
    pub events: EventSummary,
    /// Wall time from session open to extraction
    pub duration_ms: u64,
}

/// A variant that could not be tested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFailure {
    pub label: String,
    pub location: String,
    /// Error category, see [`HarnessError::kind`]
    pub kind: String,
    pub message: String,
}

/// Result of one variant, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariantOutcome {
    Completed(VariantResult),
    Failed(VariantFailure),
}

impl VariantOutcome {
    pub fn label(&self) -> &str {
        match self {
            VariantOutcome::Completed(result) => &result.label,
            VariantOutcome::Failed(failure) => &failure.label,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, VariantOutcome::Failed(_))
    }

    /// The result, if the variant completed
    pub fn result(&self) -> Option<&VariantResult> {
        match self {
            VariantOutcome::Completed(result) => Some(result),
            VariantOutcome::Failed(_) => None,
        }
    }
}

/// Results from a complete harness run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResults {
    /// Name of the run
    pub name: String,
    /// Marker the extraction started after
    pub marker: String,
    /// RFC 3339 timestamp when the run started
    pub started_at: String,
    /// Total duration of the run
    pub total_duration_ms: u64,
    /// One outcome per variant, in run order
    pub outcomes: Vec<VariantOutcome>,
    /// Every later variant compared against the first
    pub comparisons: Vec<Comparison>,
    /// Labels of the variants that could not be tested
    pub failures: Vec<String>,
    /// No failed variant and no regression
    pub passed: bool,
}

impl RunResults {
    /// Assemble results and derive comparisons from `outcomes`
    pub fn new(
        name: impl Into<String>,
        marker: impl Into<String>,
        started_at: impl Into<String>,
        total_duration_ms: u64,
        outcomes: Vec<VariantOutcome>,
    ) -> Self {
        let comparisons = compare_outcomes(&outcomes);
        let failures: Vec<String> = outcomes
            .iter()
            .filter(|o| o.is_failed())
            .map(|o| o.label().to_string())
            .collect();
        let regressed = comparisons
            .iter()
            .any(|c| c.verdict().is_some_and(|v| v.is_regression()));

        Self {
            name: name.into(),
            marker: marker.into(),
            started_at: started_at.into(),
            total_duration_ms,
            passed: failures.is_empty() && !regressed,
            outcomes,
            comparisons,
            failures,
        }
    }

    /// Whether any comparison reached a regression verdict
    pub fn has_regression(&self) -> bool {
        self.comparisons
            .iter()
            .any(|c| c.verdict().is_some_and(|v| v.is_regression()))
    }

    /// Fail if any variant could not be tested
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AggregateFailure`] naming the failed variants.
    pub fn ensure_success(&self) -> HarnessResult<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(HarnessError::AggregateFailure {
            failed: self.failures.clone(),
            total: self.outcomes.len(),
        })
    }
}

/// Drives variants through a [`SessionLauncher`]
pub struct HarnessRunner<L> {
    launcher: L,
    name: String,
    output_dir: PathBuf,
    settle: SettleStrategy,
    settle_interval: Duration,
    extract: ExtractOptions,
}

impl HarnessRunner<ChromeLauncher> {
    /// Runner backed by a real Chrome, configured from `config`
    pub fn chrome(config: &Config) -> Self {
        let launcher = ChromeLauncher::new(
            config.browser.clone(),
            config.harness.navigation_timeout(),
        );
        Self::new(launcher, &config.harness)
    }
}

impl<L: SessionLauncher> HarnessRunner<L> {
    pub fn new(launcher: L, config: &HarnessConfig) -> Self {
        Self {
            launcher,
            name: config.name.clone(),
            output_dir: config.output_dir.clone(),
            settle: config.settle,
            settle_interval: config.settle_interval(),
            extract: config.extract_options(),
        }
    }

    /// Directory snapshots are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Test every variant in order
    ///
    /// A failing variant does not stop the run; check
    /// [`RunResults::ensure_success`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns an IO error only if the output directory cannot be created.
    #[instrument(skip(self, variants), fields(run = %self.name))]
    pub async fn run(&self, variants: &[DocumentVariant]) -> HarnessResult<RunResults> {
        let start_time = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();

        tokio::fs::create_dir_all(&self.output_dir).await?;
        info!(
            "Starting '{}' with {} variants, output in {}",
            self.name,
            variants.len(),
            self.output_dir.display()
        );

        let mut outcomes = Vec::with_capacity(variants.len());
        for variant in variants {
            info!("Testing {}", variant.label);
            let outcome = match self.run_variant(variant).await {
                Ok(result) => {
                    info!(
                        "{}: {} content units after '{}' ({} visible)",
                        result.label,
                        result.extraction.count(),
                        self.extract.marker,
                        result.extraction.visible_count()
                    );
                    VariantOutcome::Completed(result)
                }
                Err(e) => {
                    error!("{} failed: {}", variant.label, e);
                    VariantOutcome::Failed(VariantFailure {
                        label: variant.label.clone(),
                        location: variant.path.display().to_string(),
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    })
                }
            };
            outcomes.push(outcome);
        }

        let results = RunResults::new(
            self.name.clone(),
            self.extract.marker.clone(),
            started_at,
            start_time.elapsed().as_millis() as u64,
            outcomes,
        );

        if results.failures.is_empty() {
            info!(
                "'{}' completed in {}ms",
                self.name, results.total_duration_ms
            );
        } else {
            warn!(
                "'{}' completed with {} failed variants",
                self.name,
                results.failures.len()
            );
        }
        Ok(results)
    }

    /// Test a single variant in a fresh session
    #[instrument(skip(self, variant), fields(variant = %variant.label))]
    pub async fn run_variant(&self, variant: &DocumentVariant) -> HarnessResult<VariantResult> {
        let start_time = Instant::now();
        let location = variant.location().await?;
        let events = EventSink::new();

        let mut session = self.launcher.open(events.clone()).await?;
        let outcome = self.drive(&mut session, variant, &location, &events).await;
        if let Err(e) = session.close().await {
            warn!("Failed to close session: {}", e);
        }

        let mut result = outcome?;
        result.duration_ms = start_time.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn drive(
        &self,
        session: &mut L::Session,
        variant: &DocumentVariant,
        location: &Url,
        events: &EventSink,
    ) -> HarnessResult<VariantResult> {
        let page = session.load(location).await?;

        let initial = capture(&page, &self.output_dir, &variant.label, Phase::Initial).await?;
        self.settle(events).await;
        let final_snapshot =
            capture(&page, &self.output_dir, &variant.label, Phase::Final).await?;

        let extraction = extract_content_after_marker(&page, &self.extract).await?;
        let events = events.summary().await;
        if events.layout_loop_detected() {
            warn!("Layout loop reported at: {}", events.layout_loops.join(", "));
        }

        Ok(VariantResult {
            label: variant.label.clone(),
            location: location.to_string(),
            extraction,
            initial,
            final_snapshot,
            events,
            duration_ms: 0,
        })
    }

    async fn settle(&self, events: &EventSink) {
        match self.settle {
            SettleStrategy::Fixed => {
                debug!("Settling for {:?}", self.settle_interval);
                tokio::time::sleep(self.settle_interval).await;
            }
            SettleStrategy::LayoutComplete => {
                if events.wait_for_layout_complete(self.settle_interval).await {
                    debug!("Layout complete");
                } else {
                    warn!(
                        "No rendered event within {:?}, continuing",
                        self.settle_interval
                    );
                }
            }
        }
    }
}
