//! Error types for harness runs
//!
//! Browser-facing operations return [`HarnessError`]. The orchestrator uses
//! [`HarnessError::kind`] to record why a variant could not run, so an
//! infrastructure failure is never mistaken for missing content.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {location} failed: {reason}")]
    Navigation { location: String, reason: String },

    #[error("Browser session is already closed")]
    SessionClosed,

    #[error("Content extraction failed: {0}")]
    Extraction(String),

    #[error("Snapshot capture failed: {0}")]
    Capture(String),

    #[error("{} of {total} variants failed: {}", failed.len(), failed.join(", "))]
    AggregateFailure { failed: Vec<String>, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Build a navigation error for a document location
    pub fn navigation(location: impl Into<String>, reason: impl ToString) -> Self {
        HarnessError::Navigation {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable name for the failure category
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::Launch(_) => "launch",
            HarnessError::Navigation { .. } => "navigation",
            HarnessError::SessionClosed => "session_closed",
            HarnessError::Extraction(_) => "extraction",
            HarnessError::Capture(_) => "capture",
            HarnessError::AggregateFailure { .. } => "aggregate_failure",
            HarnessError::Io(_) => "io",
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
