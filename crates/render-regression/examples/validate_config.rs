use render_regression::config::Config;
use std::env;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("crates/render-regression/regression.example.toml")
    };

    println!("Validating config file: {}", config_path.display());

    let config = Config::from_file(&config_path)?;
    config.validate()?;

    println!("\n✓ Successfully parsed configuration!");
    println!("\nRun: {}", config.harness.name);
    println!("Marker: {}", config.harness.marker);
    println!("Settle: {}ms ({:?})", config.harness.settle_ms, config.harness.settle);
    println!("Output: {}", config.harness.output_dir.display());
    println!("Report: {}", config.harness.report_path().display());

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Window: {}x{}",
        config.browser.window_width, config.browser.window_height
    );

    println!("\nVariants ({}):", config.variants.len());
    for (i, variant) in config.document_variants().iter().enumerate() {
        let role = if i == 0 { "baseline" } else { "candidate" };
        let exists = if variant.path.exists() { "" } else { " (missing)" };
        println!(
            "  {}. {} [{}] {}{}",
            i + 1,
            variant.label,
            role,
            variant.path.display(),
            exists
        );
    }

    println!("\n✓ All validations passed!");

    Ok(())
}
