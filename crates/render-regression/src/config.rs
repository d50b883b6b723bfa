//! Configuration parsing for regression runs
//!
//! This module provides TOML-based configuration for a harness run: the
//! documents under test, the marker that delimits the content of interest,
//! timing parameters, and the browser window the documents are rendered in.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::ExtractOptions;
use crate::runner::DocumentVariant;
use crate::snapshot::sanitize_label;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Harness parameters
    #[serde(default)]
    pub harness: HarnessConfig,
    /// Browser launch options
    #[serde(default)]
    pub browser: BrowserOptions,
    /// Documents to test, baseline first
    #[serde(default)]
    pub variants: Vec<VariantConfig>,
    /// Directory relative variant paths are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Relative variant paths and a relative `output_dir` are resolved
    /// against the directory containing the file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - Required fields are missing
    ///
    /// # Example
    ///
    /// ```no_run
    /// use render_regression::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_file("regression.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::parse(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        if let Some(base) = &config.base_dir {
            if config.harness.output_dir.is_relative() {
                config.harness.output_dir = base.join(&config.harness.output_dir);
            }
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use render_regression::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let toml = r#"
    ///     [harness]
    ///     marker = "Events"
    ///
    ///     [[variants]]
    ///     label = "original"
    ///     path = "chrometest.html"
    ///
    ///     [[variants]]
    ///     label = "patched"
    ///     path = "chrometest-with-fix.html"
    /// "#;
    /// let config = Config::parse(toml)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Check the invariants a run depends on
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.variants.len() < 2 {
            anyhow::bail!(
                "At least two variants are required (got {})",
                self.variants.len()
            );
        }
        for (i, variant) in self.variants.iter().enumerate() {
            if variant.label.trim().is_empty() {
                anyhow::bail!("Variant #{} has an empty label", i + 1);
            }
            if self.variants[..i].iter().any(|v| v.label == variant.label) {
                anyhow::bail!("Duplicate variant label: {}", variant.label);
            }
            let file_label = sanitize_label(&variant.label);
            if let Some(other) = self.variants[..i]
                .iter()
                .find(|v| sanitize_label(&v.label) == file_label)
            {
                anyhow::bail!(
                    "Variant labels '{}' and '{}' map to the same snapshot files ({})",
                    other.label,
                    variant.label,
                    file_label
                );
            }
        }
        if self.harness.marker.trim().is_empty() {
            anyhow::bail!("Marker text must not be empty");
        }
        if self.harness.max_units == 0 {
            anyhow::bail!("max_units must be greater than zero");
        }
        if self.harness.sample_len == 0 {
            anyhow::bail!("sample_len must be greater than zero");
        }
        Ok(())
    }

    /// Directory relative paths are resolved against, if loaded from a file
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// The configured documents, with paths resolved
    pub fn document_variants(&self) -> Vec<DocumentVariant> {
        self.variants
            .iter()
            .map(|v| {
                let path = match &self.base_dir {
                    Some(base) if v.path.is_relative() => base.join(&v.path),
                    _ => v.path.clone(),
                };
                DocumentVariant::new(v.label.clone(), path)
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            harness: HarnessConfig::default(),
            browser: BrowserOptions::default(),
            variants: Vec::new(),
            base_dir: None,
        }
    }
}

/// Core harness parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Name shown at the top of reports
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory for screenshots and reports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Text that marks the start of the content of interest
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Settle interval in milliseconds (default: 2000)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// How the settle interval is spent
    #[serde(default)]
    pub settle: SettleStrategy,
    /// Deadline for navigation and network quiescence (default: 30000)
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    /// Text nodes must be longer than this to count as content (default: 10)
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,
    /// Maximum characters kept per text sample (default: 100)
    #[serde(default = "default_sample_len")]
    pub sample_len: usize,
    /// Maximum content units reported per variant (default: 10)
    #[serde(default = "default_max_units")]
    pub max_units: usize,
    /// HTML report file name inside `output_dir`
    #[serde(default = "default_report_file")]
    pub report_file: String,
    /// Optional JSON results file name inside `output_dir`
    #[serde(default)]
    pub json_file: Option<String>,
}

impl HarnessConfig {
    /// The settle interval as a duration
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// The navigation deadline as a duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Extraction parameters derived from this configuration
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            marker: self.marker.clone(),
            min_text_len: self.min_text_len,
            sample_len: self.sample_len,
            max_units: self.max_units,
        }
    }

    /// Full path of the HTML report
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.report_file)
    }

    /// Full path of the JSON results file, if one is configured
    pub fn json_path(&self) -> Option<PathBuf> {
        self.json_file.as_ref().map(|f| self.output_dir.join(f))
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            output_dir: default_output_dir(),
            marker: default_marker(),
            settle_ms: default_settle_ms(),
            settle: SettleStrategy::default(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            min_text_len: default_min_text_len(),
            sample_len: default_sample_len(),
            max_units: default_max_units(),
            report_file: default_report_file(),
            json_file: None,
        }
    }
}

fn default_name() -> String {
    "Realistic Browser Test".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("realistic-test-output")
}

fn default_marker() -> String {
    "Events".to_string()
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_min_text_len() -> usize {
    10
}

fn default_sample_len() -> usize {
    100
}

fn default_max_units() -> usize {
    10
}

fn default_report_file() -> String {
    "realistic-test-report.html".to_string()
}

/// How the orchestrator waits between the initial and final snapshots
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettleStrategy {
    /// Sleep for the whole settle interval
    #[default]
    Fixed,
    /// Stop waiting once the pagination engine reports it has rendered,
    /// bounded by the settle interval
    LayoutComplete,
}

/// Browser launch configuration
///
/// The defaults describe a headful, maximized window without viewport
/// emulation, so the pagination engine lays out pages the way it would for a
/// real reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserOptions {
    /// Run without a visible window
    #[serde(default)]
    pub headless: bool,
    /// Start the window maximized
    #[serde(default = "default_true")]
    pub maximized: bool,
    /// Window width in pixels (default: 1920)
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in pixels (default: 1080)
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Pass `--no-sandbox` (default: true)
    #[serde(default = "default_true")]
    pub no_sandbox: bool,
    /// Explicit Chrome executable; auto-detected when absent
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Extra command line arguments
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            maximized: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            no_sandbox: true,
            executable: None,
            args: default_browser_args(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_browser_args() -> Vec<String> {
    vec!["--disable-dev-shm-usage".to_string()]
}

/// A document entry in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Human label, e.g. "original" or "patched"
    pub label: String,
    /// Path to the HTML document
    pub path: PathBuf,
}
