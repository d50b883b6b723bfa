//! Console reporter for run results
//!
//! Provides a human-readable summary with an ASCII table and status indicators.

use anyhow::Result;
use std::fmt::Write;

use crate::classify::ComparisonStatus;
use crate::runner::{RunResults, VariantOutcome};

/// Console format reporter
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Format run results for console output
    pub fn format(results: &RunResults) -> Result<String> {
        let mut output = String::new();

        writeln!(output)?;
        writeln!(output, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(output, "║                   RENDER REGRESSION RESULTS                  ║")?;
        writeln!(output, "╚══════════════════════════════════════════════════════════════╝")?;
        writeln!(output)?;

        writeln!(output, "Run:       {}", results.name)?;
        writeln!(output, "Marker:    {}", results.marker)?;
        writeln!(output, "Started:   {}", results.started_at)?;
        writeln!(output, "Duration:  {}ms", results.total_duration_ms)?;
        writeln!(output)?;

        writeln!(output, "  ┌──────────────────────┬────────┬─────────┬─────────┬──────────┐")?;
        writeln!(output, "  │ Variant              │ Marker │  Units  │ Visible │  Status  │")?;
        writeln!(output, "  ├──────────────────────┼────────┼─────────┼─────────┼──────────┤")?;
        for outcome in &results.outcomes {
            Self::format_outcome_row(&mut output, outcome)?;
        }
        writeln!(output, "  └──────────────────────┴────────┴─────────┴─────────┴──────────┘")?;

        let empty: Vec<&str> = results
            .outcomes
            .iter()
            .filter_map(VariantOutcome::result)
            .filter(|r| r.extraction.is_empty_after_marker())
            .map(|r| r.label.as_str())
            .collect();
        for label in empty {
            writeln!(
                output,
                "  ⚠ {}: NO CONTENT FOUND AFTER {}",
                label,
                results.marker.to_uppercase()
            )?;
        }

        if !results.comparisons.is_empty() {
            writeln!(output)?;
            writeln!(output, "Comparisons:")?;
            for comparison in &results.comparisons {
                let verdict = match &comparison.status {
                    ComparisonStatus::Classified { verdict } => verdict.to_string(),
                    ComparisonStatus::Inconclusive { reason } => {
                        format!("INCONCLUSIVE ({})", reason)
                    }
                };
                writeln!(
                    output,
                    "  {} vs {}: {}",
                    comparison.candidate, comparison.baseline, verdict
                )?;
            }
        }

        writeln!(output)?;
        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        let status = if results.passed { "PASSED" } else { "FAILED" };
        let status_symbol = if results.passed { "✓" } else { "✗" };
        writeln!(output, "Overall Status: {} {}", status_symbol, status)?;

        for outcome in &results.outcomes {
            if let VariantOutcome::Failed(failure) = outcome {
                writeln!(output, "  • {}: {}", failure.label, failure.message)?;
            }
        }

        writeln!(output)?;
        Ok(output)
    }

    fn format_outcome_row(output: &mut String, outcome: &VariantOutcome) -> Result<()> {
        match outcome {
            VariantOutcome::Completed(result) => {
                let extraction = &result.extraction;
                let marker = if extraction.marker_found { "yes" } else { "no" };
                writeln!(
                    output,
                    "  │ {:<20} │ {:^6} │ {:>7} │ {:>7} │ {:^8} │",
                    truncate(&result.label, 20),
                    marker,
                    extraction.count(),
                    extraction.visible_count(),
                    "✓ ok"
                )?;
            }
            VariantOutcome::Failed(failure) => {
                writeln!(
                    output,
                    "  │ {:<20} │ {:^6} │ {:>7} │ {:>7} │ {:^8} │",
                    truncate(&failure.label, 20),
                    "-",
                    "-",
                    "-",
                    "✗ failed"
                )?;
            }
        }
        Ok(())
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max - 1).collect();
        short.push('…');
        short
    }
}
