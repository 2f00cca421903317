use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a scrape run
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Processor catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },

    #[error("Unknown processor(s), please double-check the names: {}", .0.join(", "))]
    UnknownProcessors(Vec<String>),

    #[error("Still throttled after {attempts} attempts: {url}")]
    ThrottleRetriesExhausted { url: String, attempts: u32 },

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Export failed: {0}")]
    Export(String),
}

impl From<csv::Error> for ScrapeError {
    fn from(e: csv::Error) -> Self {
        ScrapeError::Export(e.to_string())
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(e: std::io::Error) -> Self {
        ScrapeError::Export(e.to_string())
    }
}

impl From<serde_json::Error> for ScrapeError {
    fn from(e: serde_json::Error) -> Self {
        ScrapeError::Export(e.to_string())
    }
}

/// Errors raised while loading the run configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: String, value: String },
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
