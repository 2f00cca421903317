//! Run configuration.
//!
//! Loaded from a TOML file (default `kimovil.toml`), then overridden by
//! environment variables, which may come from a `.env` file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::QuerySpec;

pub const DEFAULT_CONFIG_FILE: &str = "kimovil.toml";
pub const DEFAULT_BASE_URL: &str = "https://www.kimovil.com";

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Processor display names exactly as kimovil lists them
    pub processors: Vec<String>,
    /// 5G band filter tokens; empty means no band filter
    #[serde(default)]
    pub bands: Vec<String>,
    /// Pause between page requests
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,
    /// Pause before re-issuing a throttled (429) page request
    #[serde(default = "default_fetch_retry_ms")]
    pub fetch_retry_ms: u64,
    /// Give up on a page after this many 429s. Unbounded when unset.
    #[serde(default)]
    pub max_throttle_retries: Option<u32>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub csv_output: Option<String>,
}

fn default_fetch_delay_ms() -> u64 {
    100
}

fn default_fetch_retry_ms() -> u64 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl ScrapeConfig {
    /// Config for the given query with every knob at its default
    pub fn new(processors: Vec<String>, bands: Vec<String>) -> Self {
        Self {
            processors,
            bands,
            fetch_delay_ms: default_fetch_delay_ms(),
            fetch_retry_ms: default_fetch_retry_ms(),
            max_throttle_retries: None,
            request_timeout_secs: default_request_timeout_secs(),
            base_url: default_base_url(),
            csv_output: None,
        }
    }

    /// Load configuration: `.env`, then the TOML file, then environment overrides.
    ///
    /// The path is taken from `explicit_path`, else `KIMOVIL_CONFIG`, else `kimovil.toml`.
    pub fn load(explicit_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = explicit_path
            .map(str::to_string)
            .or_else(|| std::env::var("KIMOVIL_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut config = Self::load_from_path(Path::new(&path))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScrapeConfig = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("KIMOVIL_BASE_URL") {
            self.base_url = url;
        }
        if let Some(v) = env_number("FETCH_DELAY_MS")? {
            self.fetch_delay_ms = v;
        }
        if let Some(v) = env_number("FETCH_RETRY_MS")? {
            self.fetch_retry_ms = v;
        }
        if let Some(v) = env_number("MAX_THROTTLE_RETRIES")? {
            self.max_throttle_retries = Some(v);
        }
        if let Some(v) = env_number("REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = v;
        }
        if let Ok(path) = std::env::var("CSV_OUTPUT") {
            self.csv_output = Some(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processors.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "processors".to_string(),
            });
        }
        if let Some(blank) = self.processors.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "processors".to_string(),
                value: format!("{:?}", blank),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
            });
        }
        Ok(())
    }

    pub fn query(&self) -> QuerySpec {
        QuerySpec::new(self.processors.clone(), self.bands.clone())
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    pub fn fetch_retry(&self) -> Duration {
        Duration::from_millis(self.fetch_retry_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured CSV path, or a timestamped one in the working directory
    pub fn csv_path(&self) -> String {
        self.csv_output.clone().unwrap_or_else(|| {
            format!(
                "kimovil_phone_data_{}.csv",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            )
        })
    }
}

/// Command line of the main binary: `[-c FILE | --config FILE | FILE] [--detailed]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: Option<String>,
    pub detailed: bool,
}

impl CliArgs {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, ConfigError> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    let path = args.next().ok_or_else(|| ConfigError::EmptyRequired {
                        field: arg.clone(),
                    })?;
                    parsed.config_path = Some(path);
                }
                "--detailed" => parsed.detailed = true,
                other => {
                    if let Some(path) = other.strip_prefix("--config=") {
                        parsed.config_path = Some(path.to_string());
                    } else if !other.starts_with('-') && parsed.config_path.is_none() {
                        parsed.config_path = Some(other.to_string());
                    } else {
                        return Err(ConfigError::InvalidValue {
                            field: "argument".to_string(),
                            value: other.to_string(),
                        });
                    }
                }
            }
        }

        Ok(parsed)
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}
