//! Google Scholar author data through the search-proxy API.
//!
//! Two calls are made against the `google_scholar_author` engine: the profile
//! call (no offset) for the metrics table and citation graph, and a paginated
//! article listing walked page by page until an empty page comes back.

use crate::config::Config;
use crate::error::{PortfolioError, Result, SectionError};
use crate::fetcher::{RateLimitedFetcher, Transport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

/// Search engine name for author pages
const AUTHOR_ENGINE: &str = "google_scholar_author";

/// Citation count attached to a Scholar article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedBy {
    #[serde(default)]
    pub value: Option<u64>,
}

impl CitedBy {
    pub fn new(value: u64) -> Self {
        Self { value: Some(value) }
    }

    /// Citation count, 0 when unknown
    pub fn count(&self) -> u64 {
        self.value.unwrap_or(0)
    }
}

/// One article row from the author listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawScholarArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    /// Free text, usually "Journal volume, Year"
    #[serde(default)]
    pub publication: String,
    #[serde(default)]
    pub cited_by: Option<CitedBy>,
}

/// A profile metric: lifetime value and value over the recent window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub all: Option<u64>,
    pub since: Option<u64>,
    /// Start of the recent window, from the `since_<year>` key
    pub since_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationGraphPoint {
    pub year: i32,
    #[serde(default)]
    pub citations: u64,
}

/// Author metrics shown in the profile summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScholarProfile {
    pub citations: Metric,
    pub h_index: Metric,
    pub i10_index: Metric,
    #[serde(default)]
    pub citation_graph: Vec<CitationGraphPoint>,
    #[serde(default)]
    pub author_link: Option<String>,
}

/// Result of walking every article page.
#[derive(Debug, Clone, Default)]
pub struct ArticleHarvest {
    pub articles: Vec<RawScholarArticle>,
    /// Set when pagination stopped on a failure after some pages succeeded
    pub interrupted: Option<SectionError>,
}

impl ArticleHarvest {
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }
}

/// Scholar profile and article source.
pub struct ScholarSource<T> {
    fetcher: RateLimitedFetcher<T>,
    config: Config,
}

impl<T: Transport> ScholarSource<T> {
    pub fn new(transport: T, config: Config) -> Self {
        Self {
            fetcher: RateLimitedFetcher::from_config(transport, &config),
            config,
        }
    }

    pub fn fetcher(&self) -> &RateLimitedFetcher<T> {
        &self.fetcher
    }

    /// Fetch the author's metrics table and citation graph.
    pub async fn fetch_profile(&self) -> Result<ScholarProfile> {
        let url = self.search_url(None)?;
        info!(author = %self.config.scholar_author_id, "Fetching Scholar profile");

        let value = self.fetcher.get_json(&url).await?;
        self.check_api_error(&value)?;
        let profile = parse_profile(&value)?;

        info!(
            citations = ?profile.citations.all,
            h_index = ?profile.h_index.all,
            graph_years = profile.citation_graph.len(),
            "Scholar profile loaded"
        );
        Ok(profile)
    }

    /// Walk the article listing until a page comes back empty.
    ///
    /// A failure after at least one page keeps what was collected and marks
    /// the harvest as interrupted. A failure before any article was collected
    /// is [`PortfolioError::ArticlesUnavailable`].
    pub async fn fetch_all_articles(&self) -> Result<ArticleHarvest> {
        let page_size = self.config.page_size.max(1);
        let mut articles = Vec::new();
        let mut offset = 0;

        loop {
            match self.fetch_page(offset).await {
                Ok(page) if page.is_empty() => {
                    info!(total = articles.len(), "Scholar articles loaded");
                    return Ok(ArticleHarvest {
                        articles,
                        interrupted: None,
                    });
                }
                Ok(page) => {
                    debug!(offset = offset, count = page.len(), "Scholar page");
                    articles.extend(page);
                    offset += page_size;
                }
                Err(e) => {
                    warn!(offset = offset, collected = articles.len(), error = %e, "Article pagination stopped");
                    if articles.is_empty() {
                        return Err(PortfolioError::ArticlesUnavailable {
                            offset,
                            source: Box::new(e),
                        });
                    }
                    return Ok(ArticleHarvest {
                        articles,
                        interrupted: Some(SectionError::from(&e)),
                    });
                }
            }
        }
    }

    async fn fetch_page(&self, offset: usize) -> Result<Vec<RawScholarArticle>> {
        let url = self.search_url(Some(offset))?;
        let value = self.fetcher.get_json(&url).await?;
        self.check_api_error(&value)?;

        match value.get("articles") {
            Some(articles) if !articles.is_null() => Ok(serde_json::from_value(articles.clone())?),
            _ => Ok(Vec::new()),
        }
    }

    /// Build the (possibly proxied) search URL; `offset` selects an article page
    fn search_url(&self, offset: Option<usize>) -> Result<String> {
        let api_key = self.config.require_api_key()?;

        let mut params: Vec<(&str, String)> = vec![
            ("engine", AUTHOR_ENGINE.to_string()),
            ("author_id", self.config.scholar_author_id.clone()),
            ("hl", self.config.language.clone()),
        ];
        if let Some(start) = offset {
            params.push(("start", start.to_string()));
            params.push(("num", self.config.page_size.max(1).to_string()));
        }
        params.push(("api_key", api_key.to_string()));

        let url = Url::parse_with_params(&self.config.search_api_url, &params)
            .map_err(|e| PortfolioError::Config(format!("Invalid search API URL: {}", e)))?;
        Ok(self.config.proxied(url.as_str()))
    }

    /// The API reports logical failures in an `error` field on a 200.
    fn check_api_error(&self, value: &Value) -> Result<()> {
        match value.get("error").and_then(Value::as_str) {
            Some(message) if message.contains(&self.config.quota_marker) => {
                Err(PortfolioError::QuotaExceeded(message.to_string()))
            }
            Some(message) => Err(PortfolioError::Api(message.to_string())),
            None => Ok(()),
        }
    }
}

/// Extract metrics and graph from a profile response
fn parse_profile(value: &Value) -> Result<ScholarProfile> {
    let cited_by = value.get("cited_by");
    let table = cited_by
        .and_then(|c| c.get("table"))
        .and_then(Value::as_array)
        .ok_or_else(|| PortfolioError::ProfileUnavailable("no cited_by.table in response".into()))?;

    let metric = |key: &str| -> Result<Metric> {
        table
            .iter()
            .find_map(|entry| entry.get(key))
            .map(parse_metric)
            .ok_or_else(|| PortfolioError::ProfileUnavailable(format!("metrics table has no {}", key)))
    };

    let citation_graph = match cited_by.and_then(|c| c.get("graph")) {
        Some(graph) if graph.is_array() => serde_json::from_value(graph.clone())?,
        _ => Vec::new(),
    };

    Ok(ScholarProfile {
        citations: metric("citations")?,
        h_index: metric("h_index")?,
        i10_index: metric("i10_index")?,
        citation_graph,
        author_link: value
            .get("author_url")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// `{ "all": 120, "since_2020": 95 }` -> Metric
fn parse_metric(entry: &Value) -> Metric {
    let since = entry.as_object().and_then(|obj| {
        obj.iter()
            .find(|(key, _)| key.starts_with("since_"))
            .map(|(key, v)| (key.trim_start_matches("since_").parse().ok(), v.as_u64()))
    });

    Metric {
        all: entry.get("all").and_then(Value::as_u64),
        since: since.and_then(|(_, v)| v),
        since_year: since.and_then(|(year, _)| year),
    }
}

/// Citation graph of a profile, empty when the profile is unavailable
pub fn citation_graph_of(profile: Option<&ScholarProfile>) -> &[CitationGraphPoint] {
    profile
        .map(|p| p.citation_graph.as_slice())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::{Scripted, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn config() -> Config {
        Config {
            api_key: Some("secret".into()),
            search_api_url: "https://api.test/search.json".into(),
            ..Default::default()
        }
    }

    fn source(script: Vec<Scripted>) -> ScholarSource<Arc<ScriptedTransport>> {
        ScholarSource::new(Arc::new(ScriptedTransport::new(script)), config())
    }

    fn page(titles: &[&str]) -> Scripted {
        let articles: Vec<Value> = titles
            .iter()
            .map(|t| json!({"title": t, "link": "https://s/x", "publication": "J, 2020", "cited_by": {"value": 1}}))
            .collect();
        Scripted::json(json!({ "articles": articles }))
    }

    fn profile_body() -> Value {
        json!({
            "author_url": "https://scholar.google.com/citations?user=eJNKcHsAAAAJ",
            "cited_by": {
                "table": [
                    {"citations": {"all": 311, "since_2020": 280}},
                    {"h_index": {"all": 10, "since_2020": 9}},
                    {"i10_index": {"all": 11, "since_2020": 8}}
                ],
                "graph": [
                    {"year": 2020, "citations": 40},
                    {"year": 2021, "citations": 72}
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let source = source(vec![Scripted::json(profile_body())]);
        let profile = source.fetch_profile().await.expect("profile");

        assert_eq!(profile.citations.all, Some(311));
        assert_eq!(profile.citations.since, Some(280));
        assert_eq!(profile.citations.since_year, Some(2020));
        assert_eq!(profile.h_index.all, Some(10));
        assert_eq!(profile.i10_index.since, Some(8));
        assert_eq!(profile.citation_graph.len(), 2);
        assert!(profile.author_link.is_some());

        let calls = source.fetcher().transport().calls();
        assert!(calls[0].url.contains("engine=google_scholar_author"));
        assert!(calls[0].url.contains("api_key=secret"));
        assert!(!calls[0].url.contains("start="));
    }

    #[tokio::test]
    async fn test_profile_without_table_is_unavailable() {
        let source = source(vec![Scripted::json(json!({"cited_by": {"value": 3}}))]);
        let result = source.fetch_profile().await;
        assert!(matches!(result, Err(PortfolioError::ProfileUnavailable(_))));
    }

    #[tokio::test]
    async fn test_error_field_on_200() {
        let source = source(vec![Scripted::json(
            json!({"error": "Your account has run out of searches (monthly search limit)."}),
        )]);
        let result = source.fetch_profile().await;
        assert!(matches!(result, Err(PortfolioError::QuotaExceeded(_))));

        let source = super::ScholarSource::new(
            Arc::new(ScriptedTransport::new(vec![Scripted::json(json!({"error": "Invalid author"}))])),
            config(),
        );
        assert!(matches!(source.fetch_profile().await, Err(PortfolioError::Api(_))));
    }

    #[tokio::test]
    async fn test_pagination_stops_on_empty_page() {
        let source = source(vec![
            page(&["a", "b", "c"]),
            page(&["d", "e"]),
            page(&[]),
            page(&["never requested"]),
        ]);

        let harvest = source.fetch_all_articles().await.expect("articles");
        assert_eq!(harvest.articles.len(), 5);
        assert!(harvest.is_complete());

        let calls = source.fetcher().transport().calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].url.contains("start=0"));
        assert!(calls[1].url.contains("start=20"));
        assert!(calls[2].url.contains("start=40"));
        assert!(calls[2].url.contains("num=20"));
    }

    #[tokio::test]
    async fn test_missing_articles_field_ends_pagination() {
        let source = source(vec![page(&["a"]), Scripted::json(json!({"search_metadata": {}}))]);
        let harvest = source.fetch_all_articles().await.expect("articles");
        assert_eq!(harvest.articles.len(), 1);
        assert!(harvest.is_complete());
    }

    #[tokio::test]
    async fn test_partial_pages_kept_on_failure() {
        let source = source(vec![page(&["a", "b"]), Scripted::status(500, "upstream down")]);

        let harvest = source.fetch_all_articles().await.expect("partial harvest");
        assert_eq!(harvest.articles.len(), 2);
        let interrupted = harvest.interrupted.expect("interruption recorded");
        assert_eq!(interrupted.kind, ErrorKind::Http);
    }

    #[tokio::test]
    async fn test_failure_before_any_article_propagates() {
        let source = source(vec![Scripted::status(500, "upstream down")]);

        match source.fetch_all_articles().await {
            Err(PortfolioError::ArticlesUnavailable { offset, source }) => {
                assert_eq!(offset, 0);
                assert!(matches!(*source, PortfolioError::Http { status: 500, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_genuinely_empty_listing_is_ok() {
        let source = source(vec![page(&[])]);
        let harvest = source.fetch_all_articles().await.expect("articles");
        assert!(harvest.articles.is_empty());
        assert!(harvest.is_complete());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let source = ScholarSource::new(
            Arc::new(ScriptedTransport::new(vec![])),
            Config::default(),
        );
        assert!(matches!(source.fetch_profile().await, Err(PortfolioError::Config(_))));
        assert_eq!(source.fetcher().transport().call_count(), 0);
    }

    #[test]
    fn test_article_deserialize_null_citations() {
        let article: RawScholarArticle = serde_json::from_value(json!({
            "title": "T", "link": "L", "publication": "P", "cited_by": {"value": null}
        }))
        .expect("article");
        assert_eq!(article.cited_by.map(|c| c.count()), Some(0));

        let bare: RawScholarArticle =
            serde_json::from_value(json!({"title": "T"})).expect("article");
        assert!(bare.cited_by.is_none());
    }

    #[test]
    fn test_parse_metric_without_since() {
        let metric = parse_metric(&json!({"all": 4}));
        assert_eq!(metric.all, Some(4));
        assert_eq!(metric.since, None);
        assert_eq!(metric.since_year, None);
    }
}
