//! Full-page snapshots
//!
//! Each variant is captured twice: once as soon as the document has loaded and
//! once after the settle interval. File names depend only on the variant label
//! and the phase, so re-running a test overwrites the previous images.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::error::HarnessResult;
use crate::session::DocumentPage;

/// Point in a variant run at which a snapshot is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Immediately after the document finished loading
    Initial,
    /// After the settle interval
    Final,
}

impl Phase {
    /// Lower-case label used in file names and reports
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Initial => "initial",
            Phase::Final => "final",
        }
    }

    fn ordinal(&self) -> u8 {
        match self {
            Phase::Initial => 1,
            Phase::Final => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A captured image of a variant at one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Which phase was captured
    pub phase: Phase,
    /// Where the PNG was written
    pub path: PathBuf,
    /// Label of the captured variant
    pub variant: String,
}

impl Snapshot {
    /// File name of the image, for references relative to the output directory
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// File-name form of a variant label
///
/// Characters outside `[A-Za-z0-9._-]` are replaced with `_`. Two labels with
/// the same sanitized form would share snapshot files.
pub fn sanitize_label(variant_label: &str) -> String {
    variant_label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Deterministic image path for a variant and phase
pub fn snapshot_path(output_dir: &Path, variant_label: &str, phase: Phase) -> PathBuf {
    output_dir.join(format!(
        "{}-{:02}-{}.png",
        sanitize_label(variant_label),
        phase.ordinal(),
        phase.label()
    ))
}

/// Capture the full scrollable page and write it under `output_dir`
///
/// # Errors
///
/// Returns [`HarnessError::SessionClosed`](crate::HarnessError::SessionClosed)
/// if the page's session has been torn down, or an IO error if the image
/// cannot be written.
#[instrument(skip(page, output_dir))]
pub async fn capture<P>(
    page: &P,
    output_dir: &Path,
    variant_label: &str,
    phase: Phase,
) -> HarnessResult<Snapshot>
where
    P: DocumentPage + ?Sized,
{
    let image = page.screenshot().await?;
    let path = snapshot_path(output_dir, variant_label, phase);
    tokio::fs::write(&path, &image).await?;
    info!("{} screenshot taken: {}", phase, path.display());

    Ok(Snapshot {
        phase,
        path,
        variant: variant_label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_paths_are_deterministic() {
        let dir = Path::new("out");
        assert_eq!(
            snapshot_path(dir, "original", Phase::Initial),
            PathBuf::from("out/original-01-initial.png")
        );
        assert_eq!(
            snapshot_path(dir, "original", Phase::Final),
            PathBuf::from("out/original-02-final.png")
        );
        assert_eq!(
            snapshot_path(dir, "original", Phase::Final),
            snapshot_path(dir, "original", Phase::Final)
        );
    }

    #[test]
    fn test_snapshot_path_sanitizes_label() {
        assert_eq!(
            snapshot_path(Path::new("out"), "chrometest with/fix.html", Phase::Initial),
            PathBuf::from("out/chrometest_with_fix.html-01-initial.png")
        );
    }

    #[test]
    fn test_distinct_labels_can_share_a_file_name() {
        assert_eq!(sanitize_label("patched v2"), sanitize_label("patched_v2"));
        assert_eq!(
            snapshot_path(Path::new("out"), "patched v2", Phase::Final),
            snapshot_path(Path::new("out"), "patched_v2", Phase::Final)
        );
    }

    #[test]
    fn test_file_name() {
        let snapshot = Snapshot {
            phase: Phase::Final,
            path: PathBuf::from("/tmp/run/patched-02-final.png"),
            variant: "patched".to_string(),
        };
        assert_eq!(snapshot.file_name(), "patched-02-final.png");
    }
}
