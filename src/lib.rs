//! # scholarfolio
//!
//! Data pipeline behind an academic portfolio page: Google Scholar metrics
//! and articles (via a search API) joined with the ORCID works list.
//!
//! ## Modules
//!
//! - [`normalize`] - Title normalization and year extraction
//! - [`fetcher`] - HTTP transport and retrying JSON fetcher
//! - [`scholar`] - Scholar profile metrics and paginated articles
//! - [`orcid`] - ORCID public works
//! - [`merge`] - Join ORCID works with Scholar citation counts
//! - [`aggregate`] - Per-year buckets and chart series
//! - [`view`] - Publication list filtering and paging
//! - [`snapshot`] - Cached/fallback snapshot on disk
//! - [`pipeline`] - Concurrent load of the whole page
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholarfolio::config::Config;
//! use scholarfolio::fetcher::HttpTransport;
//! use scholarfolio::orcid::OrcidSource;
//! use scholarfolio::pipeline::PortfolioLoader;
//! use scholarfolio::scholar::ScholarSource;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let transport = HttpTransport::from_config(&config)?;
//!     let loader = PortfolioLoader::new(
//!         ScholarSource::new(transport.clone(), config.clone()),
//!         OrcidSource::new(transport, config),
//!     );
//!     let portfolio = loader.load().await;
//!     if let Ok(pubs) = &portfolio.publications {
//!         println!("Loaded {} publications", pubs.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod merge;
pub mod normalize;
pub mod orcid;
pub mod pipeline;
pub mod scholar;
pub mod snapshot;
pub mod view;

#[cfg(test)]
mod mock;

pub use error::{PortfolioError, Result};
