pub mod config;
pub mod error;
pub mod filter;
pub mod kimovil_client;
pub mod logging;
pub mod models;
pub mod processor_scraper;
pub mod report;

// Re-export main types
pub use config::{CliArgs, ScrapeConfig};
pub use error::{ConfigError, ScrapeError};
pub use filter::AttributeFilter;
pub use kimovil_client::KimovilClient;
pub use models::{FetchStats, PageStore, ProcessorCatalog, QuerySpec, ScrapeResult};
pub use processor_scraper::{extract_models, run, ProcessorScraper, ScrapeRun, ScrapeSession};
