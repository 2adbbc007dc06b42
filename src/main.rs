// src/main.rs
// =============================================================================
// This is the entry point of the spider CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, filtered by -v or RUST_LOG)
// 3. Validate the seed URL and create the save directory
// 4. Run the crawl and print the summary
//
// Exit codes:
//   0 = the crawl ran (individual page or image failures don't change this)
//   2 = setup failed before crawling started (bad URL, unusable save dir)
// =============================================================================

mod cli;
mod crawl;
mod error;
mod harvest;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use crawl::{AbsoluteUrl, CrawlReport, Crawler};
use error::HarvestError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let seed = AbsoluteUrl::parse(&cli.url)
        .ok_or_else(|| HarvestError::InvalidUrl(cli.url.clone()))
        .context("seed URL must be absolute, with a scheme and host")?;

    let config = cli.crawl_config();

    // nowhere to put images means there is no point crawling
    harvest::prepare_save_dir(&config.save_dir)
        .await
        .with_context(|| format!("could not create save directory {}", config.save_dir.display()))?;

    let crawler = Crawler::new(config).context("could not set up HTTP client")?;
    let report = crawler.run(seed).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &CrawlReport) {
    println!();
    println!("📊 Summary for {} (depth {}):", report.seed, report.depth);
    println!("   📄 Pages crawled: {}", report.pages_fetched);
    println!("   ⚠️  Pages unreachable: {}", report.page_failures);
    println!("   🖼️  Images downloaded: {}", report.downloaded.len());
    println!("   🚫 Images rejected: {}", report.images_rejected);
    println!("   ❌ Downloads failed: {}", report.download_failures);
}
