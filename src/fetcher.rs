//! HTTP transport and the rate-limited JSON fetcher.
//!
//! [`Transport`] is the only place the library touches the network;
//! [`RateLimitedFetcher`] layers the search API's throttling rules on top:
//! HTTP 429 and network failures are retried with exponential backoff, a
//! quota-exhaustion body fails at once, anything else non-2xx fails at once.

use crate::config::{Config, RetryPolicy};
use crate::error::{PortfolioError, Result};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// User agent sent with every request
const USER_AGENT: &str = concat!("scholarfolio/", env!("CARGO_PKG_VERSION"));

/// Longest body excerpt kept in error messages
const BODY_EXCERPT_LEN: usize = 200;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET requests.
///
/// Any status code is `Ok`; only a request that produced no response at all
/// is `Err(PortfolioError::Network)`.
pub trait Transport: Send + Sync {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<HttpResponse>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<HttpResponse>> {
        (**self).get(url, headers)
    }
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PortfolioError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Transport configured from `config.timeout`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.timeout)
    }
}

impl Transport for HttpTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<HttpResponse>> {
        Box::pin(async move {
            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let response = request
                .send()
                .await
                .map_err(|e| PortfolioError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| PortfolioError::Network(e.to_string()))?;

            Ok(HttpResponse { status, body })
        })
    }
}

/// One logical API call with backoff on throttling.
pub struct RateLimitedFetcher<T> {
    transport: T,
    policy: RetryPolicy,
    quota_marker: String,
}

impl<T: Transport> RateLimitedFetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy, quota_marker: impl Into<String>) -> Self {
        Self {
            transport,
            policy,
            quota_marker: quota_marker.into(),
        }
    }

    /// Fetcher using the retry policy and quota marker from `config`
    pub fn from_config(transport: T, config: &Config) -> Self {
        Self::new(transport, config.retry, config.quota_marker.clone())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// Retries 429s and network failures up to `max_attempts` times in total,
    /// sleeping `initial_delay`, then twice that, and so on between attempts.
    /// When the budget is spent the last error is returned.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = PortfolioError::RateLimited;

        for attempt in 0..max_attempts {
            match self.attempt(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    if attempt + 1 < max_attempts {
                        let delay = self.policy.delay_for(attempt);
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Retrying after backoff"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(attempts = max_attempts, error = %last_error, "Retries exhausted");
        Err(last_error)
    }

    async fn attempt(&self, url: &str) -> Result<serde_json::Value> {
        let response = self.transport.get(url, &[]).await?;
        debug!(status = response.status, bytes = response.body.len(), "Search API response");

        if response.is_success() {
            return Ok(serde_json::from_str(&response.body)?);
        }

        if response.status == 429 {
            return Err(PortfolioError::RateLimited);
        }

        let message = excerpt(&response.body);
        if response.body.contains(&self.quota_marker) {
            return Err(PortfolioError::QuotaExceeded(message));
        }

        Err(PortfolioError::Http {
            status: response.status,
            message,
        })
    }
}

/// First [`BODY_EXCERPT_LEN`] characters of a response body
pub(crate) fn excerpt(body: &str) -> String {
    body.trim().chars().take(BODY_EXCERPT_LEN).collect()
}
