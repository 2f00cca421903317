use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};
use crate::filter::{AttributeFilter, CATALOG_VALUE_ATTR};
use crate::kimovil_client::{FetchOutcome, KimovilClient};
use crate::models::{
    dedupe_preserving_order, CatalogResponse, FetchStats, ListingResponse, PageStore,
    ProcessorCatalog, QuerySpec, ScrapeResult,
};

/// Output of a full run
#[derive(Debug, Clone)]
pub struct ScrapeRun {
    pub result: ScrapeResult,
    pub stats: FetchStats,
}

/// Sequential scraper: at most one request in flight, paced by fixed delays
pub struct ProcessorScraper {
    client: KimovilClient,
    fetch_delay: Duration,
    fetch_retry: Duration,
    max_throttle_retries: Option<u32>,
    stats: FetchStats,
}

impl ProcessorScraper {
    pub fn new(client: KimovilClient, fetch_delay: Duration, fetch_retry: Duration) -> Self {
        Self {
            client,
            fetch_delay,
            fetch_retry,
            max_throttle_retries: None,
            stats: FetchStats::default(),
        }
    }

    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        let client = KimovilClient::from_config(config)?;
        Ok(Self::new(client, config.fetch_delay(), config.fetch_retry())
            .max_throttle_retries(config.max_throttle_retries))
    }

    /// Cap on consecutive 429s for one page request. `None` retries forever.
    pub fn max_throttle_retries(mut self, cap: Option<u32>) -> Self {
        self.max_throttle_retries = cap;
        self
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    /// Fetch the processor name -> ID catalog. Throttling here is fatal and not retried.
    pub async fn fetch_catalog(&mut self) -> Result<ProcessorCatalog> {
        let url = self.client.catalog_url();
        self.stats.total_requests += 1;

        let response = match self.client.get_json::<CatalogResponse>(&url).await {
            Ok(FetchOutcome::Fetched(body)) => body,
            Ok(FetchOutcome::Throttled) => {
                self.stats.rate_limited += 1;
                return Err(ScrapeError::CatalogUnavailable {
                    reason: "too many requests, try again later".to_string(),
                });
            }
            Err(e) => {
                return Err(ScrapeError::CatalogUnavailable {
                    reason: e.to_string(),
                })
            }
        };

        let filters = response.filters.ok_or_else(|| ScrapeError::CatalogUnavailable {
            reason: "response has no 'filters' field".to_string(),
        })?;

        let catalog = ProcessorCatalog::new(
            AttributeFilter::processor_ids().value_map(&filters, CATALOG_VALUE_ATTR),
        );
        info!("Found {} processors on kimovil", catalog.len());
        Ok(catalog)
    }

    /// Walk the pages of one (processor, band) unit from `start_page` until an empty page,
    /// storing each non-empty page's content.
    pub async fn fetch_pages(
        &mut self,
        catalog: &ProcessorCatalog,
        store: &mut PageStore,
        processor: &str,
        band: &str,
        start_page: u32,
    ) -> Result<()> {
        let id = catalog
            .id_of(processor)
            .ok_or_else(|| ScrapeError::UnknownProcessors(vec![processor.to_string()]))?
            .to_string();

        let mut page = start_page;
        loop {
            let url = self.client.listing_url(&id, band, page);
            let response = self.fetch_listing(&url).await?;

            if response.page_results == 0 {
                info!("{} [{}]: done after {} page(s)", processor, band_label(band), page);
                return Ok(());
            }

            let content = response.content.ok_or_else(|| ScrapeError::MalformedResponse {
                url: url.clone(),
                reason: "results reported but 'content' is missing".to_string(),
            })?;
            store.insert(processor, band, page, content);
            self.stats.pages_fetched += 1;
            info!("{} [{}]: page {}", processor, band_label(band), page + 1);

            let next = response
                .next_page_url
                .as_deref()
                .and_then(next_page_index)
                .ok_or_else(|| ScrapeError::MalformedResponse {
                    url: url.clone(),
                    reason: format!(
                        "unusable 'next_page_url': {:?}",
                        response.next_page_url
                    ),
                })?;
            if next <= page {
                return Err(ScrapeError::MalformedResponse {
                    url,
                    reason: format!("next page {} does not advance past page {}", next, page),
                });
            }

            page = next;
            sleep(self.fetch_delay).await;
        }
    }

    /// Walk every query unit in configured order, storing pages into `store` as they arrive.
    /// Unknown processors fail before any page request. On error `store` keeps every page
    /// fetched up to that point.
    pub async fn fetch_all(
        &mut self,
        catalog: &ProcessorCatalog,
        query: &QuerySpec,
        store: &mut PageStore,
    ) -> Result<()> {
        catalog.validate(query)?;

        for (processor, band) in query.units() {
            info!("Fetching {} [{}]", processor, band_label(band));
            self.fetch_pages(catalog, store, processor, band, 0).await?;
            sleep(self.fetch_delay).await;
        }

        info!(
            "Fetched {} pages in {} requests ({} throttled)",
            self.stats.pages_fetched, self.stats.total_requests, self.stats.rate_limited
        );
        Ok(())
    }

    async fn fetch_listing(&mut self, url: &str) -> Result<ListingResponse> {
        let mut throttled = 0u32;
        loop {
            self.stats.total_requests += 1;
            match self.client.get_json::<ListingResponse>(url).await? {
                FetchOutcome::Fetched(response) => return Ok(response),
                FetchOutcome::Throttled => {
                    self.stats.rate_limited += 1;
                    throttled += 1;
                    if let Some(cap) = self.max_throttle_retries {
                        if throttled > cap {
                            return Err(ScrapeError::ThrottleRetriesExhausted {
                                url: url.to_string(),
                                attempts: throttled,
                            });
                        }
                    }
                    warn!("Rate limited, waiting {:?} before retrying {}", self.fetch_retry, url);
                    sleep(self.fetch_retry).await;
                }
            }
        }
    }
}

/// Phone models per processor, across all bands and pages, first-seen order, no duplicates
pub fn extract_models(query: &QuerySpec, store: &PageStore) -> ScrapeResult {
    let filter = AttributeFilter::device_names();

    let models = query
        .processors()
        .iter()
        .map(|processor| {
            let names = query
                .bands()
                .into_iter()
                .flat_map(|band| store.fragments(processor, band))
                .filter(|fragment| {
                    let empty = fragment.trim().is_empty();
                    if empty {
                        debug!("Skipping empty fragment for {}", processor);
                    }
                    !empty
                })
                .flat_map(|fragment| filter.texts(fragment));
            (processor.clone(), dedupe_preserving_order(names))
        })
        .collect();

    ScrapeResult::new(models)
}

/// One run's state. Pages live here rather than inside the walk, so whatever was
/// fetched before an error or a cancelled walk can still be reported.
pub struct ScrapeSession {
    scraper: ProcessorScraper,
    catalog: ProcessorCatalog,
    query: QuerySpec,
    store: PageStore,
}

impl ScrapeSession {
    /// Build the scraper, resolve the catalog and check the configured processors against it
    pub async fn start(config: &ScrapeConfig) -> Result<Self> {
        let mut scraper = ProcessorScraper::from_config(config)?;
        let query = config.query();
        let catalog = scraper.fetch_catalog().await?;
        catalog.validate(&query)?;

        Ok(Self {
            scraper,
            catalog,
            query,
            store: PageStore::new(),
        })
    }

    pub async fn fetch_all(&mut self) -> Result<()> {
        self.scraper
            .fetch_all(&self.catalog, &self.query, &mut self.store)
            .await
    }

    /// Models extracted from the pages fetched so far
    pub fn results(&self) -> ScrapeRun {
        ScrapeRun {
            result: extract_models(&self.query, &self.store),
            stats: self.scraper.stats(),
        }
    }
}

/// Resolve the catalog, walk every query unit, then extract models
pub async fn run(config: &ScrapeConfig) -> Result<ScrapeRun> {
    let mut session = ScrapeSession::start(config).await?;
    session.fetch_all().await?;
    Ok(session.results())
}

/// Zero-based page index from a 1-based `next_page_url` such as `.../f_dpg+id.42,page.3`
pub fn next_page_index(next_page_url: &str) -> Option<u32> {
    static TRAILING_PAGE: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING_PAGE.get_or_init(|| Regex::new(r"\.(\d+)/?$").expect("valid regex"));

    let path = next_page_url
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let page: u32 = re.captures(path)?.get(1)?.as_str().parse().ok()?;
    page.checked_sub(1)
}

fn band_label(band: &str) -> &str {
    if band.is_empty() {
        "all bands"
    } else {
        band
    }
}
