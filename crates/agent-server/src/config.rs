use std::env;

use anyhow::{Context, Result};
use ticker_resolver::DisambiguatorConfig;

/// Environment-driven startup configuration. Every optional value falls
/// back to a sane default via `unwrap_or_else`; only the universe catalog
/// paths are required.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub kospi_csv: String,
    pub kosdaq_csv: String,
    pub alias_csv: String,
    pub ohlcv_dir: String,
    pub request_timeout_secs: u64,
    pub disambiguator: DisambiguatorConfig,
    pub json_logs: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let fuzzy_top_k = env::var("FUZZY_TOP_K")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .context("FUZZY_TOP_K must be a positive integer")?;
        let embed_top_k = env::var("EMBED_TOP_K")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .context("EMBED_TOP_K must be a positive integer")?;
        let confidence_threshold = env::var("CONFIDENCE_THRESHOLD")
            .unwrap_or_else(|_| "0.82".to_string())
            .parse()
            .context("CONFIDENCE_THRESHOLD must be a float")?;

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            kospi_csv: env::var("KOSPI_CSV").unwrap_or_else(|_| "data/kospi.csv".to_string()),
            kosdaq_csv: env::var("KOSDAQ_CSV").unwrap_or_else(|_| "data/kosdaq.csv".to_string()),
            alias_csv: env::var("ALIAS_CSV").unwrap_or_else(|_| "data/alias.csv".to_string()),
            ohlcv_dir: env::var("OHLCV_DIR").unwrap_or_else(|_| "data/ohlcv".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "40".to_string())
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be an integer")?,
            disambiguator: DisambiguatorConfig {
                fuzzy_top_k,
                embed_top_k,
                confidence_threshold,
            },
            json_logs: env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
        })
    }
}
