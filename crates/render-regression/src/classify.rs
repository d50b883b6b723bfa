//! Regression verdicts
//!
//! A verdict compares a baseline extraction with a candidate extraction. A
//! missing marker on either side is reported as such and never folded into a
//! count comparison.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::extract::Extraction;
use crate::runner::VariantOutcome;

/// Which side of a comparison lacked the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSide {
    Baseline,
    Candidate,
    Both,
}

/// Outcome of comparing a candidate with the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The candidate has at least as many content units as the baseline
    None,
    /// The candidate has fewer units, but not zero
    Reduced,
    /// The candidate has no units at all
    Eliminated,
    /// The marker was not found, so counts cannot be compared
    MarkerMissing { side: MissingSide },
}

impl Verdict {
    /// Whether this verdict should fail a release gate
    pub fn is_regression(&self) -> bool {
        !matches!(self, Verdict::None)
    }

    /// Upper-case name used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::None => "NONE",
            Verdict::Reduced => "REDUCED",
            Verdict::Eliminated => "ELIMINATED",
            Verdict::MarkerMissing { .. } => "MARKER_MISSING",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::MarkerMissing { side } => write!(f, "{} ({:?})", self.label(), side),
            _ => f.write_str(self.label()),
        }
    }
}

/// Classify by content-unit counts alone
pub fn classify_counts(baseline: usize, candidate: usize) -> Verdict {
    if candidate >= baseline {
        Verdict::None
    } else if candidate == 0 {
        Verdict::Eliminated
    } else {
        Verdict::Reduced
    }
}

/// Classify a candidate extraction against the baseline
pub fn classify(baseline: &Extraction, candidate: &Extraction) -> Verdict {
    match (baseline.marker_found, candidate.marker_found) {
        (false, false) => Verdict::MarkerMissing {
            side: MissingSide::Both,
        },
        (false, true) => Verdict::MarkerMissing {
            side: MissingSide::Baseline,
        },
        (true, false) => Verdict::MarkerMissing {
            side: MissingSide::Candidate,
        },
        (true, true) => classify_counts(baseline.count(), candidate.count()),
    }
}

/// Status of one baseline/candidate comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonStatus {
    /// Both variants completed
    Classified { verdict: Verdict },
    /// At least one variant could not be tested
    Inconclusive { reason: String },
}

/// Comparison of a candidate variant against the baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub baseline: String,
    pub candidate: String,
    pub status: ComparisonStatus,
}

impl Comparison {
    /// The verdict, when one could be reached
    pub fn verdict(&self) -> Option<Verdict> {
        match &self.status {
            ComparisonStatus::Classified { verdict } => Some(*verdict),
            ComparisonStatus::Inconclusive { .. } => None,
        }
    }
}

/// Compare every later outcome against the first one
pub fn compare_outcomes(outcomes: &[VariantOutcome]) -> Vec<Comparison> {
    let Some((baseline, candidates)) = outcomes.split_first() else {
        return Vec::new();
    };

    candidates
        .iter()
        .map(|candidate| {
            let status = match (baseline, candidate) {
                (VariantOutcome::Completed(base), VariantOutcome::Completed(cand)) => {
                    ComparisonStatus::Classified {
                        verdict: classify(&base.extraction, &cand.extraction),
                    }
                }
                _ => {
                    let failed: Vec<&str> = [baseline, candidate]
                        .iter()
                        .filter(|o| o.is_failed())
                        .map(|o| o.label())
                        .collect();
                    ComparisonStatus::Inconclusive {
                        reason: format!("variant could not run: {}", failed.join(", ")),
                    }
                }
            };
            Comparison {
                baseline: baseline.label().to_string(),
                candidate: candidate.label().to_string(),
                status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ContentUnit, LayoutRect};

    fn extraction(marker_found: bool, count: usize) -> Extraction {
        Extraction {
            marker_found,
            units: (0..count)
                .map(|i| ContentUnit {
                    text: format!("Content unit number {}", i),
                    visible: true,
                    rect: LayoutRect::default(),
                })
                .collect(),
            truncated: false,
        }
    }

    #[test]
    fn test_classify_counts() {
        assert_eq!(classify_counts(5, 5), Verdict::None);
        assert_eq!(classify_counts(5, 7), Verdict::None);
        assert_eq!(classify_counts(5, 3), Verdict::Reduced);
        assert_eq!(classify_counts(5, 0), Verdict::Eliminated);
    }

    #[test]
    fn test_classify_with_markers() {
        assert_eq!(
            classify(&extraction(true, 5), &extraction(true, 5)),
            Verdict::None
        );
        assert_eq!(
            classify(&extraction(true, 5), &extraction(true, 3)),
            Verdict::Reduced
        );
        assert_eq!(
            classify(&extraction(true, 5), &extraction(true, 0)),
            Verdict::Eliminated
        );
    }

    #[test]
    fn test_both_markers_missing_is_not_none() {
        let verdict = classify(&extraction(false, 0), &extraction(false, 0));
        assert_eq!(
            verdict,
            Verdict::MarkerMissing {
                side: MissingSide::Both
            }
        );
        assert!(verdict.is_regression());
    }

    #[test]
    fn test_missing_marker_takes_precedence_over_counts() {
        assert_eq!(
            classify(&extraction(true, 8), &extraction(false, 0)),
            Verdict::MarkerMissing {
                side: MissingSide::Candidate
            }
        );
        assert_eq!(
            classify(&extraction(false, 0), &extraction(true, 3)),
            Verdict::MarkerMissing {
                side: MissingSide::Baseline
            }
        );
    }

    #[test]
    fn test_classification_is_repeatable() {
        let baseline = extraction(true, 5);
        let candidate = extraction(true, 3);
        let first = classify(&baseline, &candidate);
        assert_eq!(first, Verdict::Reduced);
        assert_eq!(classify(&candidate, &baseline), Verdict::None);
        assert_eq!(classify(&baseline, &candidate), first);
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_string(&Verdict::Eliminated).unwrap();
        assert_eq!(json, r#"{"verdict":"ELIMINATED"}"#);

        let json = serde_json::to_string(&Verdict::MarkerMissing {
            side: MissingSide::Both,
        })
        .unwrap();
        assert_eq!(json, r#"{"verdict":"MARKER_MISSING","side":"both"}"#);
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Reduced.to_string(), "REDUCED");
        assert_eq!(
            Verdict::MarkerMissing {
                side: MissingSide::Candidate
            }
            .to_string(),
            "MARKER_MISSING (Candidate)"
        );
    }
}
