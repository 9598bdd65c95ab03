//! Runtime configuration: identifiers, endpoints and retry policy.

use crate::error::{PortfolioError, Result};
use std::time::Duration;

/// Google Scholar author id of the portfolio owner
pub const DEFAULT_SCHOLAR_AUTHOR_ID: &str = "eJNKcHsAAAAJ";

/// ORCID iD of the portfolio owner
pub const DEFAULT_ORCID_ID: &str = "0000-0003-0742-5936";

/// Search-proxy endpoint serving Google Scholar author results
pub const DEFAULT_SEARCH_API_URL: &str = "https://serpapi.com/search.json";

/// ORCID public API base
pub const DEFAULT_ORCID_API_URL: &str = "https://pub.orcid.org/v3.0";

/// Body substring the search API uses when the monthly quota is gone
pub const QUOTA_MARKER: &str = "monthly search limit";

/// Articles requested per Scholar page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Exponential backoff for throttled calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before the second attempt; doubles after every retry
    pub initial_delay: Duration,
    /// Total attempts, including the first
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub scholar_author_id: String,
    pub orcid_id: String,
    pub search_api_url: String,
    pub orcid_api_url: String,
    /// Search API key; only the Scholar source needs it
    pub api_key: Option<String>,
    /// CORS-bypass prefix; the target URL is appended percent-encoded
    pub cors_proxy: Option<String>,
    /// Interface language passed to Scholar
    pub language: String,
    pub page_size: usize,
    pub retry: RetryPolicy,
    pub quota_marker: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scholar_author_id: DEFAULT_SCHOLAR_AUTHOR_ID.to_string(),
            orcid_id: DEFAULT_ORCID_ID.to_string(),
            search_api_url: DEFAULT_SEARCH_API_URL.to_string(),
            orcid_api_url: DEFAULT_ORCID_API_URL.to_string(),
            api_key: None,
            cors_proxy: None,
            language: "pt-BR".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            quota_marker: QUOTA_MARKER.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Route a target URL through the configured CORS proxy, if any.
    pub fn proxied(&self, target: &str) -> String {
        match self.cors_proxy.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                format!("{}{}", prefix, urlencoding::encode(target))
            }
            _ => target.to_string(),
        }
    }

    /// API key, or a config error naming what is missing.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| PortfolioError::Config("search API key (SERPAPI_KEY) is not set".into()))
    }

    /// URL of the ORCID works listing for the configured iD.
    pub fn orcid_works_url(&self) -> String {
        format!(
            "{}/{}/works",
            self.orcid_api_url.trim_end_matches('/'),
            self.orcid_id
        )
    }
}
