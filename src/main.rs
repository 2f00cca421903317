use anyhow::{anyhow, Context, Result};
use kimovil_scraper::{logging, report, CliArgs, ScrapeConfig, ScrapeSession};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    println!("Kimovil Phone Data Fetcher");
    println!("==========================\n");

    // Usage: kimovil_scraper [-c CONFIG_FILE | CONFIG_FILE] [--detailed]
    let args = CliArgs::parse(std::env::args().skip(1)).context("Invalid arguments")?;
    let detailed = args.detailed;

    let config = ScrapeConfig::load(args.config_path.as_deref())
        .context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  Processors: {}", config.processors.len());
    for (i, processor) in config.processors.iter().enumerate() {
        println!("    {:2}. {}", i + 1, processor);
    }
    if config.bands.is_empty() {
        println!("  Bands: none (unfiltered)");
    } else {
        println!("  Bands: {}", config.bands.join(", "));
    }
    println!("  Delay between requests: {}ms", config.fetch_delay_ms);
    println!("  Delay after rate limit: {}ms", config.fetch_retry_ms);
    println!();

    let started = Instant::now();

    let mut session = ScrapeSession::start(&config)
        .await
        .context("Scrape aborted")?;

    // Pages stay in the session, so an aborted walk still reports what it fetched
    let walk = tokio::select! {
        res = session.fetch_all() => res.context("Scrape stopped early"),
        _ = tokio::signal::ctrl_c() => Err(anyhow!("Operation cancelled by user")),
    };
    let outcome = session.results();

    if let Err(e) = &walk {
        println!("\n⚠ {:#}", e);
        println!(
            "⚠ Saving partial results from {} fetched page(s)\n",
            outcome.stats.pages_fetched
        );
    }

    println!("{}", report::format_summary(&outcome.result, &outcome.stats));

    if detailed {
        println!("DETAILED PHONE MODELS");
        println!("{}", "=".repeat(80));
        println!("{}", report::format_detailed(&outcome.result));
    }

    let csv_path = config.csv_path();
    let rows = report::export_to_csv(&outcome.result, &csv_path)
        .with_context(|| format!("Failed to write {}", csv_path))?;
    println!("✓ {} records saved to '{}'", rows, csv_path);

    if let Ok(json_path) = std::env::var("JSON_OUTPUT") {
        report::save_to_json(&outcome.result, &json_path)
            .with_context(|| format!("Failed to write {}", json_path))?;
        println!("✓ Models saved to '{}'", json_path);
    }

    println!(
        "\n✓ Found {} phone models across {} processors in {:.1}s",
        outcome.result.total(),
        outcome.result.processor_count(),
        started.elapsed().as_secs_f64()
    );

    walk
}
