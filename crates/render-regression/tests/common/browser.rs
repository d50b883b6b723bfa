//! Browser test helpers

use render_regression::config::{BrowserOptions, Config, HarnessConfig, VariantConfig};
use render_regression::{RunResults, VariantOutcome};
use std::path::{Path, PathBuf};

/// Check if browser tests should be skipped
pub fn should_skip() -> bool {
    std::env::var("SKIP_BROWSER_TESTS").is_ok()
}

/// Macro to skip test if browser tests are disabled
#[macro_export]
macro_rules! skip_if_no_chrome {
    () => {
        if browser::should_skip() {
            eprintln!("Skipping test: SKIP_BROWSER_TESTS is set");
            return;
        }
    };
}

/// Find Chrome for Testing installed by Puppeteer
pub fn find_chrome_for_testing() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let puppeteer_cache = Path::new(&home).join(".cache/puppeteer/chrome");

    let mut versions: Vec<_> = std::fs::read_dir(&puppeteer_cache)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    versions.sort_by(|a, b| b.cmp(a));

    versions.into_iter().find_map(|version_dir| {
        [
            "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-linux64/chrome",
        ]
        .iter()
        .map(|rel| version_dir.join(rel))
        .find(|p| p.exists())
    })
}

/// Headless configuration writing into `output_dir`
pub fn test_config(output_dir: &Path, variants: Vec<VariantConfig>) -> Config {
    let executable = find_chrome_for_testing();
    if let Some(path) = &executable {
        eprintln!("Using Chrome for Testing: {}", path.display());
    }

    let mut config = Config::default();
    config.harness = HarnessConfig {
        output_dir: output_dir.to_path_buf(),
        settle_ms: 200,
        ..HarnessConfig::default()
    };
    config.browser = BrowserOptions {
        headless: true,
        maximized: false,
        executable,
        ..BrowserOptions::default()
    };
    config.variants = variants;
    config
}

/// Write `body` as an HTML document and return it as a variant
pub fn write_fixture(dir: &Path, label: &str, body: &str) -> VariantConfig {
    let path = dir.join(format!("{}.html", label));
    let html = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body></html>\n",
        label, body
    );
    std::fs::write(&path, html).expect("Should write fixture");
    VariantConfig {
        label: label.to_string(),
        path,
    }
}

/// True when the run failed only because no Chrome executable exists
///
/// Any other launch failure panics so a broken installation is not hidden.
pub fn chrome_missing(results: &RunResults) -> bool {
    let launch_failures: Vec<_> = results
        .outcomes
        .iter()
        .filter_map(|o| match o {
            VariantOutcome::Failed(f) if f.kind == "launch" => Some(f),
            _ => None,
        })
        .collect();

    if launch_failures.is_empty() {
        return false;
    }
    if launch_failures
        .iter()
        .all(|f| f.message.contains("Could not auto detect"))
    {
        eprintln!("Skipping: Chrome not installed ({})", launch_failures[0].message);
        return true;
    }
    panic!("Unexpected browser error: {}", launch_failures[0].message);
}
