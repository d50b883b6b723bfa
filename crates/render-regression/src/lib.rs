//! Rendering regression harness for paginated documents
//!
//! This crate loads two or more variants of an HTML document (typically an
//! original and a patched build) in a real Chrome window, lets a client-side
//! pagination engine reflow each one, and checks whether content that should
//! appear after a marker heading survives the reflow.
//!
//! # Features
//!
//! - **Realistic rendering**: Headful, maximized window without viewport emulation
//! - **Snapshots**: Full-page PNGs right after load and after a settle interval
//! - **Content extraction**: Text after the marker with computed visibility
//! - **Regression verdicts**: `NONE`, `REDUCED`, `ELIMINATED` or `MARKER_MISSING`
//!   against the first variant
//! - **Lifecycle observation**: Pagination engine events and layout-loop diagnostics
//! - **Multiple Output Formats**: HTML, JSON, and Console reports
//!
//! # Example
//!
//! ```no_run
//! use render_regression::{Config, HarnessRunner, reporter::{Reporter, OutputFormat}};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Load configuration
//! let config = Config::from_file("regression.toml")?;
//! config.validate()?;
//!
//! // Run every variant
//! let runner = HarnessRunner::chrome(&config);
//! let results = runner.run(&config.document_variants()).await?;
//!
//! // Report results
//! Reporter::new(OutputFormat::Html).write_to_file(&results, config.harness.report_path())?;
//! Reporter::new(OutputFormat::Console).report(&results)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Runs are configured using TOML files:
//!
//! ```toml
//! [harness]
//! marker = "Events"
//! settle_ms = 2000
//!
//! [[variants]]
//! label = "original"
//! path = "chrometest.html"
//!
//! [[variants]]
//! label = "patched"
//! path = "chrometest-with-fix.html"
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod reporter;
pub mod runner;
pub mod session;
pub mod snapshot;

// Re-export main types for convenience
pub use classify::{classify, Comparison, Verdict};
pub use config::Config;
pub use error::{HarnessError, HarnessResult};
pub use extract::{extract_content_after_marker, ContentUnit, Extraction};
pub use reporter::{OutputFormat, Reporter};
pub use runner::{DocumentVariant, HarnessRunner, RunResults, VariantOutcome, VariantResult};
pub use snapshot::{capture, Phase, Snapshot};
