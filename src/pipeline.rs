//! Page-level orchestration.
//!
//! Fires the three upstream fetches together, waits for all of them, then
//! merges and aggregates. Each page section carries either its data or the
//! reason it could not be loaded; a failed publication fetch never produces
//! a partial merge.

use crate::aggregate::{aggregate_years, YearBucket};
use crate::error::{ErrorKind, Result, SectionError};
use crate::fetcher::Transport;
use crate::merge::{merge_publications, MergedPublication};
use crate::orcid::{OrcidSource, RawOrcidWork};
use crate::scholar::{citation_graph_of, ArticleHarvest, ScholarProfile, ScholarSource};
use crate::snapshot::{Snapshot, SnapshotStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

/// Section payload or the error that replaces it
pub type Section<T> = std::result::Result<T, SectionError>;

/// Where the data on the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    /// Fetched just now
    Live,
    /// Snapshot younger than the cache TTL; nothing was fetched
    Cache,
    /// Live fetch failed; stale snapshot served instead
    Fallback,
}

/// Everything the page renders.
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub profile: Section<ScholarProfile>,
    pub publications: Section<Vec<MergedPublication>>,
    pub years: Section<Vec<YearBucket>>,
    pub origin: DataOrigin,
    pub generated_at: DateTime<Utc>,
    /// Non-fatal problems: interrupted pagination, failures hidden by a fallback
    pub warnings: Vec<SectionError>,
}

impl Portfolio {
    fn from_snapshot(snapshot: Snapshot, origin: DataOrigin, warnings: Vec<SectionError>) -> Self {
        let years = aggregate_years(
            citation_graph_of(snapshot.profile.as_ref()),
            &snapshot.publications,
        );
        Self {
            profile: snapshot.profile.ok_or_else(|| SectionError {
                kind: ErrorKind::Shape,
                message: "snapshot has no Scholar profile".to_string(),
            }),
            publications: Ok(snapshot.publications),
            years: Ok(years),
            origin,
            generated_at: snapshot.generated_at,
            warnings,
        }
    }
}

/// Loads the portfolio from Scholar and ORCID, with optional snapshot cache.
pub struct PortfolioLoader<S, O> {
    scholar: ScholarSource<S>,
    orcid: OrcidSource<O>,
    store: Option<SnapshotStore>,
}

impl<S: Transport, O: Transport> PortfolioLoader<S, O> {
    pub fn new(scholar: ScholarSource<S>, orcid: OrcidSource<O>) -> Self {
        Self {
            scholar,
            orcid,
            store: None,
        }
    }

    /// Use `store` as cache and fallback
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Serve a fresh snapshot if there is one, otherwise load live.
    pub async fn load(&self) -> Portfolio {
        if let Some(snapshot) = self.store.as_ref().and_then(|s| s.load_fresh(Utc::now())) {
            info!(generated_at = %snapshot.generated_at, "Serving cached snapshot");
            return Portfolio::from_snapshot(snapshot, DataOrigin::Cache, Vec::new());
        }
        self.load_live().await
    }

    /// Fetch everything, ignoring any cached snapshot.
    pub async fn load_live(&self) -> Portfolio {
        let (profile, harvest, works) = futures::join!(
            self.scholar.fetch_profile(),
            self.scholar.fetch_all_articles(),
            self.orcid.fetch_works(),
        );

        if let Err(e) = &profile {
            warn!(error = %e, "Scholar metrics unavailable");
        }

        match merge_sources(harvest, works) {
            Ok((publications, mut warnings)) => {
                let profile: Section<ScholarProfile> = profile.map_err(SectionError::from);
                let years = aggregate_years(
                    citation_graph_of(profile.as_ref().ok()),
                    &publications,
                );

                if profile.is_ok() && warnings.is_empty() {
                    self.save_snapshot(profile.as_ref().ok(), &publications);
                }
                if let Err(e) = &profile {
                    warnings.push(e.clone());
                }

                Portfolio {
                    profile,
                    publications: Ok(publications),
                    years: Ok(years),
                    origin: DataOrigin::Live,
                    generated_at: Utc::now(),
                    warnings,
                }
            }
            Err(failure) => self.fall_back(profile, failure),
        }
    }

    fn fall_back(
        &self,
        profile: Result<ScholarProfile>,
        failure: SectionError,
    ) -> Portfolio {
        error!(error = %failure.message, "Publication load failed");

        if let Some(snapshot) = self.store.as_ref().and_then(SnapshotStore::load) {
            info!(generated_at = %snapshot.generated_at, "Serving fallback snapshot");
            let mut warnings = vec![failure];
            let live_profile = match profile {
                Ok(p) => Some(p),
                Err(e) => {
                    warnings.push(SectionError::from(&e));
                    None
                }
            };
            let mut portfolio = Portfolio::from_snapshot(snapshot, DataOrigin::Fallback, warnings);
            if let Some(live) = live_profile {
                if let Ok(publications) = &portfolio.publications {
                    portfolio.years = Ok(aggregate_years(&live.citation_graph, publications));
                }
                portfolio.profile = Ok(live);
            }
            return portfolio;
        }

        Portfolio {
            profile: profile.map_err(SectionError::from),
            publications: Err(failure.clone()),
            years: Err(failure),
            origin: DataOrigin::Live,
            generated_at: Utc::now(),
            warnings: Vec::new(),
        }
    }

    fn save_snapshot(&self, profile: Option<&ScholarProfile>, publications: &[MergedPublication]) {
        if let Some(store) = &self.store {
            let snapshot = Snapshot::new(profile.cloned(), publications.to_vec());
            if let Err(e) = store.save(&snapshot) {
                warn!(error = %e, "Failed to write snapshot");
            }
        }
    }
}

/// Merge only when both sources resolved; interrupted pagination is a warning.
fn merge_sources(
    harvest: Result<ArticleHarvest>,
    works: Result<Vec<RawOrcidWork>>,
) -> Section<(Vec<MergedPublication>, Vec<SectionError>)> {
    let (harvest, works) = match (harvest, works) {
        (Ok(h), Ok(w)) => (h, w),
        (Err(e), _) | (_, Err(e)) => return Err(SectionError::from(&e)),
    };

    let warnings = harvest.interrupted.iter().cloned().collect();
    Ok((merge_publications(&works, &harvest.articles), warnings))
}
