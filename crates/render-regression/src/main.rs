//! Render regression harness binary
//!
//! Renders each document variant in Chrome, writes snapshots and reports to
//! the output directory, and exits non-zero when a candidate regressed.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use render_regression::config::{Config, VariantConfig};
use render_regression::{HarnessRunner, OutputFormat, Reporter, RunResults};

const EXIT_REGRESSION: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "render-regression")]
#[command(
    version,
    about = "Compare how document variants survive client-side pagination"
)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for snapshots and reports
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Text that starts the content of interest
    #[arg(long)]
    marker: Option<String>,

    /// Milliseconds to wait between the initial and final snapshots
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Summary printed to stdout
    #[arg(short, long, value_enum, default_value = "console")]
    format: OutputFormat,

    /// Documents as LABEL=PATH, baseline first
    #[arg(value_parser = parse_variant)]
    variants: Vec<VariantConfig>,
}

fn parse_variant(s: &str) -> Result<VariantConfig, String> {
    let (label, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=PATH, got '{}'", s))?;
    if label.is_empty() || path.is_empty() {
        return Err(format!("expected LABEL=PATH, got '{}'", s));
    }
    Ok(VariantConfig {
        label: label.to_string(),
        path: PathBuf::from(path),
    })
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(output) = &args.output {
        config.harness.output_dir = output.clone();
    }
    if let Some(marker) = &args.marker {
        config.harness.marker = marker.clone();
    }
    if let Some(settle_ms) = args.settle_ms {
        config.harness.settle_ms = settle_ms;
    }
    if args.headless {
        config.browser.headless = true;
    }

    if !args.variants.is_empty() {
        // Command-line paths are relative to the working directory
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        config.variants = args
            .variants
            .iter()
            .map(|v| VariantConfig {
                label: v.label.clone(),
                path: cwd.join(&v.path),
            })
            .collect();
    } else if config.variants.is_empty() {
        config.variants = vec![
            VariantConfig {
                label: "original".to_string(),
                path: PathBuf::from("chrometest.html"),
            },
            VariantConfig {
                label: "patched".to_string(),
                path: PathBuf::from("chrometest-with-fix.html"),
            },
        ];
    }

    config.validate()?;
    Ok(config)
}

fn write_reports(config: &Config, results: &RunResults) -> anyhow::Result<()> {
    let report_path = config.harness.report_path();
    Reporter::new(OutputFormat::Html).write_to_file(results, &report_path)?;
    info!("Report saved: {}", report_path.display());

    if let Some(json_path) = config.harness.json_path() {
        Reporter::new(OutputFormat::JsonPretty).write_to_file(results, &json_path)?;
        info!("Results saved: {}", json_path.display());
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = load_config(&args)?;
    info!(
        "Starting {} v{} ({} variants)",
        config.harness.name,
        env!("CARGO_PKG_VERSION"),
        config.variants.len()
    );

    let runner = HarnessRunner::chrome(&config);
    let results = runner
        .run(&config.document_variants())
        .await
        .context("Harness run failed")?;

    write_reports(&config, &results)?;
    Reporter::new(args.format).report(&results)?;

    if let Err(e) = results.ensure_success() {
        error!("{}", e);
        return Ok(ExitCode::from(EXIT_FAILURE));
    }
    if results.has_regression() {
        warn!("Regression detected");
        return Ok(ExitCode::from(EXIT_REGRESSION));
    }
    info!("No content issues detected");
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
