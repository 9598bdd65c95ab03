//! Join ORCID works with Scholar citation data on normalized title.
//!
//! ORCID decides which publications exist and supplies their bibliographic
//! fields. Scholar only contributes a citation count and, when it has one, a
//! link. Scholar articles with no ORCID counterpart are dropped.

use crate::normalize::{extract_year, normalize_title};
use crate::orcid::RawOrcidWork;
use crate::scholar::{CitedBy, RawScholarArticle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// An ORCID work enriched with Scholar's citation count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedPublication {
    pub title: String,
    pub doi: Option<String>,
    pub doi_link: Option<String>,
    pub year: String,
    pub journal_title: String,
    pub link: Option<String>,
    #[serde(rename = "cited_by")]
    pub cited_by: Option<CitedBy>,
}

impl MergedPublication {
    /// Citation count, 0 when Scholar had no match or no count
    pub fn citations(&self) -> u64 {
        self.cited_by.map(|c| c.count()).unwrap_or(0)
    }

    /// "Journal, Year" line, without the trailing separator when the year is unknown
    pub fn publication(&self) -> String {
        match (self.journal_title.is_empty(), self.year.is_empty()) {
            (_, true) => self.journal_title.clone(),
            (true, false) => self.year.clone(),
            (false, false) => format!("{}, {}", self.journal_title, self.year),
        }
    }

    /// Calendar year, taken from the publication line
    pub fn publication_year(&self) -> Option<i32> {
        extract_year(&self.publication())
    }
}

/// What a Scholar article contributes to a merge
#[derive(Debug, Clone, Copy)]
struct ScholarHit<'a> {
    cited_by: Option<CitedBy>,
    link: &'a str,
}

/// Merge ORCID works with Scholar articles.
///
/// Produces exactly one record per ORCID work, sorted by citation count
/// descending. Ties keep ORCID's order. When several Scholar articles share a
/// normalized title the first one wins.
pub fn merge_publications(
    orcid_works: &[RawOrcidWork],
    scholar_articles: &[RawScholarArticle],
) -> Vec<MergedPublication> {
    let mut lookup: HashMap<String, ScholarHit<'_>> = HashMap::with_capacity(scholar_articles.len());
    for article in scholar_articles {
        lookup
            .entry(normalize_title(&article.title))
            .or_insert(ScholarHit {
                cited_by: article.cited_by,
                link: &article.link,
            });
    }

    let mut merged: Vec<MergedPublication> = orcid_works
        .iter()
        .map(|work| {
            let hit = lookup.get(&normalize_title(&work.title));

            // Scholar's link wins when Scholar knows the work
            let link = match hit {
                Some(h) if !h.link.is_empty() => Some(h.link.to_string()),
                _ => work.link.clone(),
            };

            MergedPublication {
                title: work.title.clone(),
                doi: work.doi.clone(),
                doi_link: work.doi_link.clone(),
                year: work.year.clone(),
                journal_title: work.journal_title.clone(),
                link,
                cited_by: hit.and_then(|h| h.cited_by),
            }
        })
        .collect();

    // Vec::sort_by_key is stable
    merged.sort_by_key(|p| std::cmp::Reverse(p.citations()));

    let matched = merged.iter().filter(|p| p.cited_by.is_some()).count();
    info!(
        orcid = orcid_works.len(),
        scholar = scholar_articles.len(),
        matched = matched,
        "Publications merged"
    );

    merged
}
