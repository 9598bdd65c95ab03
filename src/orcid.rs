//! ORCID public API client.
//!
//! Fetches `/v3.0/{orcid}/works` and flattens every work group into one
//! [`RawOrcidWork`]. ORCID is the authoritative list of what the author has
//! published; it carries DOI, journal and year but no citation counts.

use crate::config::Config;
use crate::error::{PortfolioError, Result};
use crate::fetcher::Transport;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Resolver used when ORCID gives a DOI without its own URL
const DOI_RESOLVER: &str = "https://doi.org";

/// A work as listed on the ORCID record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrcidWork {
    pub title: String,
    pub doi: Option<String>,
    pub doi_link: Option<String>,
    /// Publication year as ORCID reports it, empty when unknown
    pub year: String,
    pub journal_title: String,
    /// Work URL, falling back to the DOI link
    pub link: Option<String>,
}

/// Source of the author's ORCID works.
pub struct OrcidSource<T> {
    transport: T,
    config: Config,
}

impl<T: Transport> OrcidSource<T> {
    pub fn new(transport: T, config: Config) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch and flatten the public works list.
    ///
    /// Any non-2xx status is [`PortfolioError::OrcidUnavailable`]; there is no
    /// retry on this endpoint.
    pub async fn fetch_works(&self) -> Result<Vec<RawOrcidWork>> {
        let url = self.config.proxied(&self.config.orcid_works_url());
        info!(orcid = %self.config.orcid_id, "Fetching ORCID works");

        let response = self
            .transport
            .get(&url, &[("Accept", "application/json")])
            .await?;

        if !response.is_success() {
            return Err(PortfolioError::OrcidUnavailable {
                status: response.status,
            });
        }

        let data: OrcidWorksResponse = serde_json::from_str(&response.body)?;
        let groups = data.group.len();
        let works = flatten_works(data);

        info!(groups = groups, works = works.len(), "ORCID works loaded");
        Ok(works)
    }
}

// === ORCID API Response Types ===

#[derive(Debug, Deserialize)]
struct OrcidWorksResponse {
    group: Vec<OrcidGroup>,
}

#[derive(Debug, Deserialize)]
struct OrcidGroup {
    #[serde(rename = "work-summary")]
    work_summary: Option<Vec<WorkSummary>>,
}

#[derive(Debug, Deserialize)]
struct WorkSummary {
    title: Option<OrcidTitle>,
    #[serde(rename = "external-ids")]
    external_ids: Option<ExternalIds>,
    #[serde(rename = "publication-date")]
    publication_date: Option<PublicationDate>,
    #[serde(rename = "journal-title")]
    journal_title: Option<ValueField>,
    url: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct OrcidTitle {
    title: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "external-id")]
    external_id: Option<Vec<ExternalId>>,
}

#[derive(Debug, Deserialize)]
struct ExternalId {
    #[serde(rename = "external-id-type")]
    id_type: Option<String>,
    #[serde(rename = "external-id-value")]
    id_value: Option<String>,
    #[serde(rename = "external-id-url")]
    id_url: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct PublicationDate {
    year: Option<ValueField>,
}

fn field(v: Option<ValueField>) -> Option<String> {
    v.and_then(|f| f.value)
}

/// First summary of every group; groups without a title are skipped.
fn flatten_works(data: OrcidWorksResponse) -> Vec<RawOrcidWork> {
    data.group
        .into_iter()
        .filter_map(|group| group.work_summary?.into_iter().next())
        .filter_map(parse_work_summary)
        .collect()
}

fn parse_work_summary(summary: WorkSummary) -> Option<RawOrcidWork> {
    let title = match field(summary.title.and_then(|t| t.title)) {
        Some(title) if !title.is_empty() => title,
        _ => {
            debug!("Skipping ORCID work without title");
            return None;
        }
    };

    let (doi, doi_link) = summary
        .external_ids
        .and_then(|ids| ids.external_id)
        .and_then(|ids| {
            ids.into_iter().find(|id| {
                id.id_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case("doi"))
            })
        })
        .and_then(|id| {
            let doi = id.id_value.filter(|v| !v.is_empty())?;
            let link = field(id.id_url)
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| format!("{}/{}", DOI_RESOLVER, doi));
            Some((doi, link))
        })
        .map_or((None, None), |(doi, link)| (Some(doi), Some(link)));

    let year = field(summary.publication_date.and_then(|d| d.year)).unwrap_or_default();
    let journal_title = field(summary.journal_title).unwrap_or_default();
    let link = field(summary.url)
        .filter(|u| !u.is_empty())
        .or_else(|| doi_link.clone());

    Some(RawOrcidWork {
        title,
        doi,
        doi_link,
        year,
        journal_title,
        link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Scripted, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn works_body() -> serde_json::Value {
        json!({
            "group": [
                {"work-summary": [{
                    "title": {"title": {"value": "Deep Learning in Genomics"}},
                    "external-ids": {"external-id": [
                        {"external-id-type": "eid", "external-id-value": "2-s2.0-1"},
                        {"external-id-type": "doi", "external-id-value": "10.1/abc",
                         "external-id-url": {"value": "https://doi.org/10.1/abc"}}
                    ]},
                    "publication-date": {"year": {"value": "2020"}},
                    "journal-title": {"value": "Genetics"},
                    "url": {"value": "https://journal.test/abc"}
                }]},
                {"work-summary": [{
                    "title": null,
                    "publication-date": {"year": {"value": "2019"}}
                }]},
                {"work-summary": [
                    {
                        "title": {"title": {"value": "Cassava breeding"}},
                        "external-ids": {"external-id": [
                            {"external-id-type": "doi", "external-id-value": "10.2/xyz", "external-id-url": null}
                        ]},
                        "publication-date": null,
                        "journal-title": null,
                        "url": null
                    },
                    {"title": {"title": {"value": "Duplicate summary ignored"}}}
                ]},
                {"work-summary": [{
                    "title": {"title": {"value": "No identifiers"}},
                    "external-ids": {"external-id": []}
                }]},
                {"work-summary": []}
            ]
        })
    }

    fn source(script: Vec<Scripted>) -> OrcidSource<Arc<ScriptedTransport>> {
        OrcidSource::new(Arc::new(ScriptedTransport::new(script)), Config::default())
    }

    #[tokio::test]
    async fn test_fetch_works_flattens_groups() {
        let source = source(vec![Scripted::json(works_body())]);
        let works = source.fetch_works().await.expect("works");

        assert_eq!(works.len(), 3);

        assert_eq!(works[0].title, "Deep Learning in Genomics");
        assert_eq!(works[0].doi.as_deref(), Some("10.1/abc"));
        assert_eq!(works[0].doi_link.as_deref(), Some("https://doi.org/10.1/abc"));
        assert_eq!(works[0].year, "2020");
        assert_eq!(works[0].journal_title, "Genetics");
        assert_eq!(works[0].link.as_deref(), Some("https://journal.test/abc"));

        assert_eq!(works[1].title, "Cassava breeding");
        assert_eq!(works[1].doi_link.as_deref(), Some("https://doi.org/10.2/xyz"));
        assert_eq!(works[1].year, "");
        assert_eq!(works[1].journal_title, "");
        assert_eq!(works[1].link, works[1].doi_link);

        assert_eq!(works[2].title, "No identifiers");
        assert!(works[2].doi.is_none());
        assert!(works[2].doi_link.is_none());
        assert!(works[2].link.is_none());
    }

    #[tokio::test]
    async fn test_request_uses_accept_json() {
        let source = source(vec![Scripted::json(json!({"group": []}))]);
        let works = source.fetch_works().await.expect("works");
        assert!(works.is_empty());

        let calls = source.transport().calls();
        assert!(calls[0].url.ends_with("/0000-0003-0742-5936/works"));
        assert!(calls[0]
            .headers
            .iter()
            .any(|(k, v)| k == "Accept" && v == "application/json"));
    }

    #[tokio::test]
    async fn test_non_success_is_orcid_unavailable() {
        let source = source(vec![Scripted::status(503, "maintenance")]);
        let result = source.fetch_works().await;
        assert!(matches!(
            result,
            Err(PortfolioError::OrcidUnavailable { status: 503 })
        ));
        assert_eq!(source.transport().call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_group_is_shape_error() {
        let source = source(vec![Scripted::json(json!({"last-modified-date": null}))]);
        let result = source.fetch_works().await;
        assert!(matches!(result, Err(PortfolioError::Json(_))));
    }

    #[test]
    fn test_only_empty_titles_are_skipped() {
        let data: OrcidWorksResponse = serde_json::from_value(json!({"group": [
            {"work-summary": [{"title": {"title": {"value": "   "}}}]},
            {"work-summary": [{"title": {"title": {"value": ""}}}]},
            {"work-summary": [{"title": {"title": {"value": "Real"}}}]}
        ]}))
        .expect("response");

        let works = flatten_works(data);
        let titles: Vec<_> = works.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, ["   ", "Real"]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let work = RawOrcidWork {
            title: "T".into(),
            doi_link: Some("https://doi.org/x".into()),
            journal_title: "J".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&work).expect("json");
        assert_eq!(value["doiLink"], "https://doi.org/x");
        assert_eq!(value["journalTitle"], "J");
    }
}
