//! Per-year citation and publication series for the chart.
//!
//! Citation counts come from Scholar's citation graph; publication counts
//! come from counting merged publications by year. A year shows up when
//! either count is non-zero.

use crate::merge::MergedPublication;
use crate::scholar::CitationGraphPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Smallest bubble drawn, so years without publications stay visible
const MIN_BUBBLE_SIZE: f64 = 10.0;

/// Bubble size of the year with the most publications
const MAX_BUBBLE_SIZE: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBucket {
    pub year: i32,
    pub citations: u64,
    pub publication_count: u32,
}

/// Fold the citation graph and publication years into ascending year buckets.
pub fn aggregate_years(
    graph: &[CitationGraphPoint],
    publications: &[MergedPublication],
) -> Vec<YearBucket> {
    let mut by_year: BTreeMap<i32, YearBucket> = graph
        .iter()
        .map(|point| {
            (
                point.year,
                YearBucket {
                    year: point.year,
                    citations: point.citations,
                    publication_count: 0,
                },
            )
        })
        .collect();

    for year in publications.iter().filter_map(MergedPublication::publication_year) {
        by_year
            .entry(year)
            .or_insert(YearBucket {
                year,
                citations: 0,
                publication_count: 0,
            })
            .publication_count += 1;
    }

    let buckets: Vec<YearBucket> = by_year
        .into_values()
        .filter(|b| b.publication_count > 0 || b.citations > 0)
        .collect();

    debug!(years = buckets.len(), "Year buckets built");
    buckets
}

/// Parallel series ready for a bubble chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub years: Vec<i32>,
    pub citations: Vec<u64>,
    pub publications: Vec<u32>,
    pub bubble_sizes: Vec<f64>,
}

/// The first `len` points of a [`ChartSeries`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartFrame<'a> {
    pub years: &'a [i32],
    pub citations: &'a [u64],
    pub publications: &'a [u32],
    pub bubble_sizes: &'a [f64],
}

impl ChartSeries {
    pub fn from_buckets(buckets: &[YearBucket]) -> Self {
        let max_pubs = buckets
            .iter()
            .map(|b| b.publication_count)
            .max()
            .unwrap_or(0)
            .max(1);

        Self {
            years: buckets.iter().map(|b| b.year).collect(),
            citations: buckets.iter().map(|b| b.citations).collect(),
            publications: buckets.iter().map(|b| b.publication_count).collect(),
            bubble_sizes: buckets
                .iter()
                .map(|b| {
                    (b.publication_count as f64 / max_pubs as f64 * MAX_BUBBLE_SIZE)
                        .max(MIN_BUBBLE_SIZE)
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Year of the point at `index`, as reported by a chart click
    pub fn year_at(&self, index: usize) -> Option<i32> {
        self.years.get(index).copied()
    }

    /// Growing prefixes, one point more per frame, for the reveal animation.
    pub fn frames(&self) -> impl Iterator<Item = ChartFrame<'_>> + '_ {
        (1..=self.len()).map(move |len| ChartFrame {
            years: &self.years[..len],
            citations: &self.citations[..len],
            publications: &self.publications[..len],
            bubble_sizes: &self.bubble_sizes[..len],
        })
    }

    /// Y-axis range with headroom above the largest citation count.
    pub fn citation_axis(&self) -> (f64, f64) {
        let max = self.citations.iter().copied().max().unwrap_or(0) as f64;
        let lower = if max > 5.0 { -max * 0.1 } else { -1.0 };
        let upper = if max == 0.0 { 10.0 } else { max * 1.1 };
        (lower, upper)
    }
}
