//! Title normalization and year extraction.
//!
//! Neither Scholar nor ORCID exposes an identifier the other knows about, so
//! publications are joined on a normalized title. The rules here are the
//! whole definition of "same publication".

use once_cell::sync::Lazy;
use regex::Regex;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

/// Punctuation removed from titles before comparison.
const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`', '~',
    '(', ')',
];

/// Canonical join key for a publication title.
///
/// Strips HTML tags, lower-cases, removes [`STRIPPED_PUNCTUATION`], collapses
/// whitespace runs to a single space and trims. Total over all input.
pub fn normalize_title(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }

    let untagged = strip_html_tags(title);
    let lowered: String = untagged
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();

    WHITESPACE.replace_all(&lowered, " ").trim().to_string()
}

/// Remove anything that looks like an HTML tag.
pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

/// Last 19xx/20xx year mentioned in free text, e.g. `"Crop Science, 2021"`.
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR.find_iter(text)
        .last()
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_title("Deep Learning, 2020!"), "deep learning 2020");
        assert_eq!(
            normalize_title("Deep Learning, 2020!"),
            normalize_title("deep learning 2020")
        );
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_title(""), "");
        assert_eq!(normalize_title("   "), "");
        assert_eq!(normalize_title("<b></b>"), "");
    }

    #[test]
    fn test_normalize_strips_tags_and_collapses() {
        assert_eq!(
            normalize_title("  <i>Genomic</i>   selection:\tan  (overview) "),
            "genomic selection an overview"
        );
    }

    #[test]
    fn test_normalize_keeps_other_symbols() {
        // Only the fixed set is stripped; question marks and quotes survive.
        assert_eq!(normalize_title("Why? 'Maize'"), "why? 'maize'");
        assert_ne!(normalize_title("Maize yield"), normalize_title("Maize yields"));
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "Deep Learning, 2020!",
            "<<a>b> c",
            "a<b(>c",
            "  Multi   Space\n\nTitle ",
            "Ünïcödé – Títle (2019)",
            "x - y _ z",
            "<>",
            "",
        ];
        for s in samples {
            let once = normalize_title(s);
            assert_eq!(normalize_title(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_extract_year_prefers_last() {
        assert_eq!(extract_year("Crop Science 1998, 2021"), Some(2021));
        assert_eq!(extract_year("Plants, 2019"), Some(2019));
        assert_eq!(extract_year("2020"), Some(2020));
    }

    #[test]
    fn test_extract_year_rejects_non_years() {
        assert_eq!(extract_year(""), None);
        assert_eq!(extract_year("Volume 1850, pages 12345"), None);
        assert_eq!(extract_year("id 120201"), None);
    }
}
