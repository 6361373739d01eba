//! Runs one analysis from the command line.
//!
//! Usage: `analyze_url <product-url> [--report]`

use anyhow::{bail, Result};
use dotenv::dotenv;

use review_insight::config::Config;
use review_insight::crawler::source_from_config;
use review_insight::pipeline::{Analyzer, AnalyzerSettings};
use review_insight::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(telemetry::env_filter())
        .with_writer(std::io::stderr)
        .init();

    let mut url = None;
    let mut report = false;
    for arg in std::env::args().skip(1) {
        if arg == "--report" {
            report = true;
        } else if url.is_none() {
            url = Some(arg);
        } else {
            bail!("unexpected argument: {}", arg);
        }
    }
    let Some(url) = url else {
        bail!("usage: analyze_url <product-url> [--report]");
    };

    let config = Config::from_env()?;
    eprintln!("🔍 Analyzing {} with the {:?} backend...", url, config.backend);
    let analyzer = Analyzer::new(source_from_config(&config), AnalyzerSettings::from(&config));

    if report {
        let report = analyzer.analyze(&url).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", analyzer.analyze_summary(&url).await?);
    }
    Ok(())
}
