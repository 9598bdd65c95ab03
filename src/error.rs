//! Custom error types for scholarfolio.
//!
//! Every fallible function in the library returns `Result<T, PortfolioError>`.
//! [`PortfolioError::kind`] folds the variants onto the handful of failure
//! categories the page cares about, and [`SectionError`] is the cloneable
//! summary a failed page section carries around.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for scholarfolio operations.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// HTTP 429 from the search API. Absorbed by the retry loop unless the
    /// attempt budget runs out.
    #[error("Rate limited (HTTP 429)")]
    RateLimited,

    /// The search API's monthly quota is exhausted. Retrying cannot help.
    #[error("Search quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Non-success HTTP status other than 429
    #[error("HTTP error: {status} - {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body excerpt or reason phrase
        message: String,
    },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Response parsed but is missing expected fields
    #[error("Unexpected response shape: {0}")]
    Shape(String),

    /// Search API returned an `error` field on an otherwise successful response
    #[error("API error: {0}")]
    Api(String),

    /// Scholar profile has no metrics table
    #[error("Scholar profile unavailable: {0}")]
    ProfileUnavailable(String),

    /// ORCID answered with a non-success status
    #[error("ORCID works unavailable (HTTP {status})")]
    OrcidUnavailable {
        /// HTTP status code
        status: u16,
    },

    /// Article pagination failed before a single article was collected
    #[error("No Scholar articles could be fetched (failed at offset {offset}): {source}")]
    ArticlesUnavailable {
        /// Offset of the page that failed
        offset: usize,
        /// Underlying failure
        #[source]
        source: Box<PortfolioError>,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `PortfolioError`
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Failure categories visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    QuotaExceeded,
    Http,
    Network,
    Shape,
}

impl PortfolioError {
    /// Category of this error.
    ///
    /// Local failures (I/O, configuration) are reported as `Shape`: the data
    /// the page expected is not there.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited => ErrorKind::RateLimited,
            Self::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            Self::Http { .. } | Self::OrcidUnavailable { .. } | Self::Api(_) => ErrorKind::Http,
            Self::Network(_) => ErrorKind::Network,
            Self::ArticlesUnavailable { source, .. } => source.kind(),
            Self::Shape(_)
            | Self::ProfileUnavailable(_)
            | Self::Json(_)
            | Self::Io(_)
            | Self::Config(_) => ErrorKind::Shape,
        }
    }

    /// Whether the retry loop should try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Network(_))
    }
}

/// Serializable record of a failed page section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SectionError {
    /// Message shown in place of the section's data.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::QuotaExceeded => {
                "The monthly search limit was reached; citations and publications could not be refreshed."
                    .to_string()
            }
            _ => format!("Failed to load data: {}", self.message),
        }
    }
}

impl From<&PortfolioError> for SectionError {
    fn from(e: &PortfolioError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<PortfolioError> for SectionError {
    fn from(e: PortfolioError) -> Self {
        Self::from(&e)
    }
}
