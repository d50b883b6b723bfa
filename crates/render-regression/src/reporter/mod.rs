//! Run result reporting
//!
//! This module formats run results as an HTML report, JSON, or a
//! human-readable console summary.
//!
//! # Output Formats
//!
//! - **HTML**: The report written next to the snapshots
//! - **JSON**: Machine-readable format for CI/CD integration
//! - **Console**: Human-readable summary with a status table
//!
//! # Example
//!
//! ```no_run
//! use render_regression::reporter::{Reporter, OutputFormat};
//! use render_regression::runner::RunResults;
//!
//! # fn example(results: RunResults) -> anyhow::Result<()> {
//! let reporter = Reporter::new(OutputFormat::Console);
//! reporter.report(&results)?;
//!
//! // Or write to a file
//! Reporter::new(OutputFormat::Html)
//!     .write_to_file(&results, "realistic-test-output/realistic-test-report.html")?;
//! # Ok(())
//! # }
//! ```

mod console;
mod html;
mod json;

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::runner::RunResults;

pub use console::ConsoleReporter;
pub use html::{escape_html, HtmlReporter};
pub use json::JsonReporter;

/// Output format for run results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Standalone HTML page referencing the snapshots
    Html,
    /// JSON format for machine parsing
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Console summary
    Console,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Console
    }
}

/// Reporter for run results
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    /// Create a new reporter with the specified output format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Report results to stdout
    pub fn report(&self, results: &RunResults) -> Result<()> {
        let output = self.format_results(results)?;
        print!("{}", output);
        io::stdout().flush()?;
        Ok(())
    }

    /// Write results to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, results: &RunResults, path: P) -> Result<()> {
        let path = path.as_ref();
        let output = self.format_results(results)?;
        fs::write(path, output)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Format results as a string
    pub fn format_results(&self, results: &RunResults) -> Result<String> {
        match self.format {
            OutputFormat::Html => HtmlReporter::format(results),
            OutputFormat::Json => JsonReporter::format(results, false),
            OutputFormat::JsonPretty => JsonReporter::format(results, true),
            OutputFormat::Console => ConsoleReporter::format(results),
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{VariantFailure, VariantOutcome};

    fn create_test_results() -> RunResults {
        RunResults::new(
            "Test Run",
            "Events",
            "2024-01-01T00:00:00Z",
            5000,
            vec![VariantOutcome::Failed(VariantFailure {
                label: "original".to_string(),
                location: "chrometest.html".to_string(),
                kind: "navigation".to_string(),
                message: "Navigation to chrometest.html failed: No such file".to_string(),
            })],
        )
    }

    #[test]
    fn test_reporter_json_format() {
        let results = create_test_results();
        let output = Reporter::new(OutputFormat::Json)
            .format_results(&results)
            .unwrap();

        assert!(output.contains("Test Run"));
        assert!(output.contains("\"kind\":\"navigation\""));
    }

    #[test]
    fn test_reporter_console_format() {
        let results = create_test_results();
        let output = Reporter::new(OutputFormat::Console)
            .format_results(&results)
            .unwrap();

        assert!(output.contains("Test Run"));
        assert!(output.contains("original"));
    }

    #[test]
    fn test_reporter_html_format() {
        let results = create_test_results();
        let output = Reporter::new(OutputFormat::Html)
            .format_results(&results)
            .unwrap();

        assert!(output.starts_with("<!DOCTYPE html>"));
        assert!(output.contains("Generated at: "));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("realistic-test-report.html");
        Reporter::new(OutputFormat::Html)
            .write_to_file(&create_test_results(), &path)
            .unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("Test Run Report"));
    }

    #[test]
    fn test_default_format() {
        let reporter = Reporter::default();
        assert_eq!(reporter.format, OutputFormat::Console);
    }
}
