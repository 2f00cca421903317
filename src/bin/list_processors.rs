use kimovil_scraper::config::{DEFAULT_BASE_URL, DEFAULT_CONFIG_FILE};
use kimovil_scraper::{logging, KimovilClient, ProcessorScraper, ScrapeConfig};
use std::time::Duration;

// Usage: list_processors [SEARCH]
// Prints the processor names kimovil knows, optionally only those containing SEARCH,
// then checks the names configured in kimovil.toml (or KIMOVIL_CONFIG) against them.
#[tokio::main]
async fn main() {
    logging::init();

    let search = std::env::args().nth(1).map(|s| s.to_lowercase());
    let config = match ScrapeConfig::load(None) {
        Ok(config) => Some(config),
        Err(e) => {
            println!("⚠ No usable {} ({}), listing catalog only\n", DEFAULT_CONFIG_FILE, e);
            None
        }
    };

    let client = match &config {
        Some(config) => KimovilClient::from_config(config),
        None => KimovilClient::new(DEFAULT_BASE_URL, Duration::from_secs(30)),
    };
    let client = match client {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ Error creating HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let mut scraper = ProcessorScraper::new(client, Duration::ZERO, Duration::ZERO);
    let catalog = match scraper.fetch_catalog().await {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Found {} processors\n", catalog.len());
    for name in catalog.names() {
        if let Some(search) = &search {
            if !name.to_lowercase().contains(search) {
                continue;
            }
        }
        println!("  {:<40} {}", name, catalog.id_of(name).unwrap_or_default());
    }

    if let Some(config) = config {
        println!("\nConfigured processors ({}):", config.processors.len());
        for (i, processor) in config.processors.iter().enumerate() {
            let status = if catalog.contains(processor) { "✓" } else { "✗" };
            println!("  {:2}. {} {}", i + 1, status, processor);
        }
    }
}
