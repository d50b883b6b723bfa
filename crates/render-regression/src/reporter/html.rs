//! HTML report
//!
//! The report sits next to the snapshots in the output directory and refers
//! to them by file name.

use anyhow::Result;
use std::fmt::Write;

use crate::classify::{Comparison, ComparisonStatus};
use crate::events::EventSummary;
use crate::runner::{RunResults, VariantFailure, VariantOutcome, VariantResult};

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 20px; }
        .test-result { border: 1px solid #ddd; margin: 20px 0; padding: 15px; }
        .screenshot-timeline { display: grid; grid-template-columns: repeat(2, 1fr); gap: 10px; margin: 20px 0; }
        .screenshot { border: 1px solid #ccc; padding: 5px; text-align: center; }
        .screenshot img { max-width: 100%; height: auto; }
        .content-analysis { background: #f9f9f9; padding: 10px; margin: 10px 0; }
        .visible { color: green; }
        .hidden { color: red; }
        .warning { color: #b00020; font-weight: bold; }
        .notice { color: #8a6d00; font-weight: bold; }
        .failure { border-color: #b00020; }
        .summary { background: #f0f8ff; padding: 15px; margin: 10px 0; }
        table { border-collapse: collapse; }
        td, th { border: 1px solid #ccc; padding: 4px 8px; text-align: left; }
"#;

/// HTML format reporter
pub struct HtmlReporter;

impl HtmlReporter {
    /// Render the full report, stamped with the current time
    pub fn format(results: &RunResults) -> Result<String> {
        Self::format_at(results, &chrono::Utc::now().to_rfc3339())
    }

    /// Render the full report with an explicit generation timestamp
    pub fn format_at(results: &RunResults, generated_at: &str) -> Result<String> {
        let mut html = String::new();
        let title = escape_html(&results.name);

        writeln!(html, "<!DOCTYPE html>")?;
        writeln!(html, "<html>")?;
        writeln!(html, "<head>")?;
        writeln!(html, "    <meta charset=\"utf-8\">")?;
        writeln!(html, "    <title>{} Report</title>", title)?;
        writeln!(html, "    <style>{}    </style>", STYLE)?;
        writeln!(html, "</head>")?;
        writeln!(html, "<body>")?;
        writeln!(html, "    <h1>{} Report</h1>", title)?;

        writeln!(html, "    <div class=\"summary\">")?;
        writeln!(html, "        <h2>Test Summary</h2>")?;
        writeln!(html, "        <p>Generated at: {}</p>", escape_html(generated_at))?;
        writeln!(html, "        <p>Run started: {}</p>", escape_html(&results.started_at))?;
        writeln!(html, "        <p>Duration: {}ms</p>", results.total_duration_ms)?;
        writeln!(
            html,
            "        <p>Variants: {} tested, {} failed</p>",
            results.outcomes.len(),
            results.failures.len()
        )?;
        writeln!(html, "    </div>")?;

        if !results.comparisons.is_empty() {
            Self::format_comparisons(&mut html, &results.comparisons)?;
        }

        for outcome in &results.outcomes {
            match outcome {
                VariantOutcome::Completed(result) => {
                    Self::format_variant(&mut html, result, &results.marker)?
                }
                VariantOutcome::Failed(failure) => Self::format_failure(&mut html, failure)?,
            }
        }

        writeln!(html, "</body>")?;
        writeln!(html, "</html>")?;
        Ok(html)
    }

    fn format_comparisons(html: &mut String, comparisons: &[Comparison]) -> Result<()> {
        writeln!(html, "    <div class=\"summary\">")?;
        writeln!(html, "        <h2>Comparisons</h2>")?;
        writeln!(html, "        <table>")?;
        writeln!(
            html,
            "            <tr><th>Candidate</th><th>Baseline</th><th>Verdict</th></tr>"
        )?;
        for comparison in comparisons {
            let verdict = match &comparison.status {
                ComparisonStatus::Classified { verdict } => verdict.to_string(),
                ComparisonStatus::Inconclusive { reason } => format!("INCONCLUSIVE ({})", reason),
            };
            writeln!(
                html,
                "            <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&comparison.candidate),
                escape_html(&comparison.baseline),
                escape_html(&verdict)
            )?;
        }
        writeln!(html, "        </table>")?;
        writeln!(html, "    </div>")?;
        Ok(())
    }

    fn format_variant(html: &mut String, result: &VariantResult, marker: &str) -> Result<()> {
        let extraction = &result.extraction;
        let marker_html = escape_html(marker);

        writeln!(html, "    <div class=\"test-result\">")?;
        writeln!(html, "        <h2>{}</h2>", escape_html(&result.label))?;
        writeln!(html, "        <p>{}</p>", escape_html(&result.location))?;
        writeln!(html, "        <div class=\"content-analysis\">")?;
        writeln!(html, "            <h3>Content After {} Section</h3>", marker_html)?;

        if !extraction.marker_found {
            writeln!(
                html,
                "            <p class=\"notice\">Marker \"{}\" not found in document</p>",
                marker_html
            )?;
        } else {
            writeln!(
                html,
                "            <p>Found {} content items after \"{}\"{}</p>",
                extraction.count(),
                marker_html,
                if extraction.truncated { " (list capped)" } else { "" }
            )?;

            if extraction.units.is_empty() {
                writeln!(
                    html,
                    "            <p class=\"warning\">NO CONTENT FOUND AFTER {}</p>",
                    escape_html(&marker.to_uppercase())
                )?;
            } else {
                writeln!(html, "            <ul>")?;
                for unit in &extraction.units {
                    let (class, text) = if unit.visible {
                        ("visible", "Visible")
                    } else {
                        ("hidden", "Hidden")
                    };
                    writeln!(
                        html,
                        "                <li class=\"{}\">\"{}...\" - {} at ({:.0}, {:.0}) {:.0}&times;{:.0}</li>",
                        class,
                        escape_html(&unit.text),
                        text,
                        unit.rect.x,
                        unit.rect.y,
                        unit.rect.width,
                        unit.rect.height
                    )?;
                }
                writeln!(html, "            </ul>")?;
            }
        }
        writeln!(html, "        </div>")?;

        Self::format_events(html, &result.events)?;

        writeln!(html, "        <h3>Screenshot Timeline</h3>")?;
        writeln!(html, "        <div class=\"screenshot-timeline\">")?;
        for (heading, snapshot) in [
            ("Initial Load", &result.initial),
            ("After Settle", &result.final_snapshot),
        ] {
            let file = escape_html(&snapshot.file_name());
            writeln!(html, "            <div class=\"screenshot\">")?;
            writeln!(html, "                <h4>{}</h4>", heading)?;
            writeln!(
                html,
                "                <img src=\"{}\" alt=\"{}\">",
                file, snapshot.phase
            )?;
            writeln!(html, "            </div>")?;
        }
        writeln!(html, "        </div>")?;
        writeln!(html, "    </div>")?;
        Ok(())
    }

    fn format_events(html: &mut String, events: &EventSummary) -> Result<()> {
        writeln!(html, "        <h3>Pagination Events</h3>")?;
        writeln!(html, "        <ul>")?;
        writeln!(
            html,
            "            <li>Layout started: {}</li>",
            if events.before_layout { "yes" } else { "no" }
        )?;
        writeln!(html, "            <li>Pages laid out: {}</li>", events.pages_laid_out)?;
        let rendered = match (events.rendered, events.rendered_pages) {
            (true, Some(pages)) => format!("yes ({} pages)", pages),
            (true, None) => "yes".to_string(),
            (false, _) => "no".to_string(),
        };
        writeln!(html, "            <li>Rendered: {}</li>", rendered)?;
        for element in &events.layout_loops {
            writeln!(
                html,
                "            <li class=\"hidden\">Layout repeated at: {}</li>",
                escape_html(element)
            )?;
        }
        writeln!(html, "        </ul>")?;
        Ok(())
    }

    fn format_failure(html: &mut String, failure: &VariantFailure) -> Result<()> {
        writeln!(html, "    <div class=\"test-result failure\">")?;
        writeln!(html, "        <h2>{}</h2>", escape_html(&failure.label))?;
        writeln!(html, "        <p>{}</p>", escape_html(&failure.location))?;
        writeln!(
            html,
            "        <p class=\"failure\">FAILED ({}): {}</p>",
            escape_html(&failure.kind),
            escape_html(&failure.message)
        )?;
        writeln!(html, "    </div>")?;
        Ok(())
    }
}

/// Escape HTML entities for safe embedding
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ContentUnit, Extraction, LayoutRect};
    use crate::snapshot::{Phase, Snapshot};
    use std::path::PathBuf;

    fn variant(label: &str, marker_found: bool, texts: &[&str]) -> VariantOutcome {
        VariantOutcome::Completed(VariantResult {
            label: label.to_string(),
            location: format!("file:///tmp/{}.html", label),
            extraction: Extraction {
                marker_found,
                units: texts
                    .iter()
                    .enumerate()
                    .map(|(i, text)| ContentUnit {
                        text: text.to_string(),
                        visible: i % 2 == 0,
                        rect: LayoutRect {
                            x: 10.0,
                            y: 100.0 + i as f64 * 20.0,
                            width: 500.0,
                            height: 18.0,
                        },
                    })
                    .collect(),
                truncated: false,
            },
            initial: Snapshot {
                phase: Phase::Initial,
                path: PathBuf::from(format!("/tmp/out/{}-01-initial.png", label)),
                variant: label.to_string(),
            },
            final_snapshot: Snapshot {
                phase: Phase::Final,
                path: PathBuf::from(format!("/tmp/out/{}-02-final.png", label)),
                variant: label.to_string(),
            },
            events: EventSummary::default(),
            duration_ms: 2500,
        })
    }

    fn results(outcomes: Vec<VariantOutcome>) -> RunResults {
        RunResults::new(
            "Realistic Browser Test",
            "Events",
            "2024-01-01T00:00:00Z",
            5000,
            outcomes,
        )
    }

    #[test]
    fn test_report_lists_units_and_snapshots() {
        let results = results(vec![
            variant("original", true, &["Opening keynote by the organizers", "Workshop on layout engines"]),
            variant("patched", true, &["Opening keynote by the organizers", "Workshop on layout engines"]),
        ]);
        let html = HtmlReporter::format_at(&results, "2024-01-01T00:00:05Z").unwrap();

        assert!(html.contains("Generated at: 2024-01-01T00:00:05Z"));
        assert!(html.contains("Found 2 content items after \"Events\""));
        assert!(html.contains("Workshop on layout engines"));
        assert!(html.contains("<img src=\"original-01-initial.png\""));
        assert!(html.contains("<img src=\"patched-02-final.png\""));
        assert!(html.contains("<li class=\"hidden\">"));
        assert!(html.contains("<td>NONE</td>"));
        assert!(!html.contains("class=\"warning\""));
    }

    #[test]
    fn test_empty_after_marker_shows_warning() {
        let results = results(vec![
            variant("original", true, &["Opening keynote by the organizers"]),
            variant("patched", true, &[]),
        ]);
        let html = HtmlReporter::format(&results).unwrap();

        assert!(html.contains("<p class=\"warning\">NO CONTENT FOUND AFTER EVENTS</p>"));
        assert!(html.contains("<td>ELIMINATED</td>"));
        assert_eq!(html.matches("class=\"warning\"").count(), 1);
    }

    #[test]
    fn test_missing_marker_is_not_reported_as_empty() {
        let results = results(vec![variant("original", false, &[]), variant("patched", false, &[])]);
        let html = HtmlReporter::format(&results).unwrap();

        assert!(html.contains("Marker \"Events\" not found in document"));
        assert!(!html.contains("NO CONTENT FOUND"));
        assert!(html.contains("MARKER_MISSING (Both)"));
    }

    #[test]
    fn test_failed_variant_is_shown() {
        let failed = VariantOutcome::Failed(VariantFailure {
            label: "patched".to_string(),
            location: "/tmp/patched.html".to_string(),
            kind: "navigation".to_string(),
            message: "Navigation to /tmp/patched.html failed: net::ERR_FILE_NOT_FOUND".to_string(),
        });
        let results = results(vec![variant("original", true, &["Opening keynote by the organizers"]), failed]);
        let html = HtmlReporter::format(&results).unwrap();

        assert!(html.contains("<p class=\"failure\">FAILED (navigation)"));
        assert!(html.contains("INCONCLUSIVE"));
        assert!(html.contains("Variants: 2 tested, 1 failed"));
    }

    #[test]
    fn test_text_is_escaped() {
        let results = results(vec![variant("a<b>", true, &["<script>alert('x')</script>"])]);
        let html = HtmlReporter::format(&results).unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("<h2>a&lt;b&gt;</h2>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("\"quoted\""), "&quot;quoted&quot;");
    }
}
