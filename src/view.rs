//! Filter and paging state for the publication list.
//!
//! The merged collection is loaded once; every interaction here re-queries
//! it in memory. At most one year filter is active at a time. The year
//! filter narrows first and the text query narrows the result further.

use crate::merge::MergedPublication;
use crate::normalize::normalize_title;

/// Cards shown before the first "show more" on the index page
pub const INITIAL_VISIBLE: usize = 3;

/// Cards added by each "show more"
pub const VISIBLE_STEP: usize = 3;

/// How much of the filtered list is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Index page: a short list that grows on demand
    Paged { initial: usize, step: usize },
    /// Publications page: everything that matches
    All,
}

impl Default for PageMode {
    fn default() -> Self {
        Self::Paged {
            initial: INITIAL_VISIBLE,
            step: VISIBLE_STEP,
        }
    }
}

/// The window currently shown.
#[derive(Debug, Clone, PartialEq)]
pub struct VisiblePage<'a> {
    pub items: Vec<&'a MergedPublication>,
    pub shown: usize,
    /// Number of publications matching the active filters
    pub total: usize,
    pub has_more: bool,
}

/// Publication list state: year filter, text query and page size.
#[derive(Debug, Clone)]
pub struct PublicationView {
    publications: Vec<MergedPublication>,
    mode: PageMode,
    year: Option<i32>,
    query: String,
    limit: usize,
}

impl PublicationView {
    pub fn new(publications: Vec<MergedPublication>, mode: PageMode) -> Self {
        Self {
            publications,
            mode,
            year: None,
            query: String::new(),
            limit: initial_limit(mode),
        }
    }

    pub fn publications(&self) -> &[MergedPublication] {
        &self.publications
    }

    pub fn year_filter(&self) -> Option<i32> {
        self.year
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Chart click: select `year`, or clear the filter if it is already selected.
    ///
    /// Clears the text query and resets the page size.
    pub fn toggle_year(&mut self, year: i32) {
        self.year = if self.year == Some(year) { None } else { Some(year) };
        self.query.clear();
        self.reset_limit();
    }

    pub fn clear_year(&mut self) {
        self.year = None;
    }

    /// New search text; resets the page size.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_string();
        self.reset_limit();
    }

    /// Clear button: drops the query and the year filter.
    pub fn clear(&mut self) {
        self.query.clear();
        self.year = None;
        self.reset_limit();
    }

    /// Grow the window by one step, never past the filtered total.
    pub fn show_more(&mut self) {
        if let PageMode::Paged { step, .. } = self.mode {
            let total = self.filtered().count();
            self.limit = (self.limit + step).min(total.max(initial_limit(self.mode)));
        }
    }

    pub fn visible(&self) -> VisiblePage<'_> {
        let matching: Vec<&MergedPublication> = self.filtered().collect();
        let total = matching.len();
        let items: Vec<&MergedPublication> = matching.into_iter().take(self.limit).collect();
        let shown = items.len();

        VisiblePage {
            items,
            shown,
            total,
            has_more: shown < total,
        }
    }

    fn filtered(&self) -> impl Iterator<Item = &MergedPublication> + '_ {
        let needle = self.query.to_lowercase();
        self.publications
            .iter()
            .filter(move |p| self.year.is_none() || p.publication_year() == self.year)
            .filter(move |p| needle.is_empty() || matches_query(p, &needle))
    }

    fn reset_limit(&mut self) {
        self.limit = initial_limit(self.mode);
    }
}

fn initial_limit(mode: PageMode) -> usize {
    match mode {
        PageMode::Paged { initial, .. } => initial,
        PageMode::All => usize::MAX,
    }
}

/// Case-insensitive match over title, journal, year and DOI
fn matches_query(p: &MergedPublication, needle: &str) -> bool {
    normalize_title(&p.title).contains(needle)
        || p.title.to_lowercase().contains(needle)
        || p.journal_title.to_lowercase().contains(needle)
        || p.year.contains(needle)
        || p.doi
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}
