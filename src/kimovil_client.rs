use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const LISTING_PATH: &str = "/en/compare-smartphones";

/// Result of one request: a decoded body, or a 429
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Fetched(T),
    Throttled,
}

/// Thin async client for kimovil's XHR listing endpoints
#[derive(Debug, Clone)]
pub struct KimovilClient {
    client: Client,
    base_url: String,
}

impl KimovilClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let base_url = base_url.trim_end_matches('/').to_string();
        if let Ok(referer) = HeaderValue::from_str(&format!("{}{}", base_url, LISTING_PATH)) {
            headers.insert(REFERER, referer);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }

    /// Unfiltered listing, whose `filters` field carries the processor catalog
    pub fn catalog_url(&self) -> String {
        format!("{}{}?xhr=1", self.base_url, LISTING_PATH)
    }

    /// Listing for one processor, optionally band-filtered, at a zero-based page index
    pub fn listing_url(&self, processor_id: &str, band: &str, page: u32) -> String {
        let mut url = format!("{}{}/f_dpg+id.{}", self.base_url, LISTING_PATH, processor_id);
        if !band.is_empty() {
            url.push(',');
            url.push_str(band);
        }
        if page > 0 {
            url.push_str(&format!(",page.{}", page + 1));
        }
        url.push_str("?xhr=1");
        url
    }

    /// GET `url` and decode its JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<FetchOutcome<T>> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(FetchOutcome::Throttled);
        }
        if !status.is_success() {
            return Err(ScrapeError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map(FetchOutcome::Fetched)
            .map_err(|e| ScrapeError::MalformedResponse {
                url: url.to_string(),
                reason: format!("invalid JSON: {}", e),
            })
    }
}
