//! Title index and free-text title resolution.
//!
//! This module builds the normalized lookup structure over all known book
//! titles and resolves free-text queries against it using a three-tier
//! strategy: exact match, then substring match, then fuzzy match. The index
//! position of a title doubles as its row/column index into the similarity
//! matrix, so the two structures must be built from the same title sequence.
//!
//! # Usage
//!
//! ```
//! use book_recommend::matching::TitleIndex;
//! use book_recommend::models::MatchKind;
//!
//! let index = TitleIndex::build(vec![
//!     "1984".to_string(),
//!     "Harry Potter".to_string(),
//! ]).unwrap();
//!
//! let m = index.resolve("harry potter").unwrap();
//! assert_eq!(m.position, 1);
//! assert_eq!(m.matched_title, "Harry Potter");
//! assert_eq!(m.kind, MatchKind::Exact);
//! ```

use thiserror::Error;

use crate::models::{MatchKind, TitleMatch};

/// Minimum similarity ratio for the fuzzy tier to accept a candidate.
pub const FUZZY_MATCH_CUTOFF: f64 = 0.6;

/// Errors that can occur while building the title index.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The title sequence was empty
    #[error("Cannot build a title index from an empty title sequence")]
    EmptyIndex,
}

/// Result type for index construction.
pub type MatchResult<T> = Result<T, MatchError>;

/// Normalizes a title or query for case-insensitive comparison.
///
/// Applies the following transformations:
/// - Converts to lowercase
/// - Trims leading/trailing whitespace
/// - Collapses consecutive whitespace to a single space
pub fn normalize_title(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized lookup structure over all known book titles.
///
/// Holds the original-cased titles plus a lowercase-normalized parallel
/// sequence; position `i` in both always refers to the same catalog item,
/// and equals row/column `i` of the similarity matrix. Immutable once built.
#[derive(Debug, Clone)]
pub struct TitleIndex {
    /// Original-cased titles in artifact row order
    titles: Vec<String>,

    /// Lowercase-normalized parallel sequence, same length and order
    normalized: Vec<String>,
}

impl TitleIndex {
    /// Build an index from the pivot artifact's title sequence.
    ///
    /// Normalization is pure precomputation done once here, O(N).
    ///
    /// # Errors
    /// Returns `MatchError::EmptyIndex` if `titles` is empty.
    pub fn build(titles: Vec<String>) -> MatchResult<Self> {
        if titles.is_empty() {
            return Err(MatchError::EmptyIndex);
        }
        let normalized = titles.iter().map(|t| normalize_title(t)).collect();
        Ok(Self { titles, normalized })
    }

    /// Number of indexed titles.
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    /// Whether the index is empty. Always false for a built index.
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// The original-cased title at `position`, if in range.
    pub fn title(&self, position: usize) -> Option<&str> {
        self.titles.get(position).map(|t| t.as_str())
    }

    /// Resolve a free-text query to an indexed title.
    ///
    /// Tiers are tried in strict precedence order, first hit wins:
    ///
    /// 1. **Exact**: normalized equality; the lowest matching position wins
    ///    so repeated titles resolve deterministically.
    /// 2. **Substring**: the first normalized entry, in index order, that
    ///    contains the normalized query.
    /// 3. **Fuzzy**: `strsim::normalized_levenshtein` between the raw query
    ///    and the raw titles; the best candidate is accepted only if its
    ///    ratio is at least `cutoff`, ties broken by the lower position.
    ///
    /// Empty or whitespace-only queries return `None` without scanning.
    pub fn resolve(&self, query: &str) -> Option<TitleMatch> {
        self.resolve_with_cutoff(query, FUZZY_MATCH_CUTOFF)
    }

    /// Same as [`resolve`](Self::resolve) with an explicit fuzzy cutoff.
    pub fn resolve_with_cutoff(&self, query: &str, cutoff: f64) -> Option<TitleMatch> {
        let needle = normalize_title(query);
        if needle.is_empty() {
            return None;
        }

        // Tier 1: exact match on the normalized sequence
        if let Some(position) = self.normalized.iter().position(|t| *t == needle) {
            return Some(self.matched(position, MatchKind::Exact));
        }

        // Tier 2: substring scan in index order
        if let Some(position) = self.normalized.iter().position(|t| t.contains(&needle)) {
            return Some(self.matched(position, MatchKind::Substring));
        }

        // Tier 3: closest match on the raw titles
        let raw_query = query.trim();
        let mut best: Option<(usize, f64)> = None;
        for (position, title) in self.titles.iter().enumerate() {
            let ratio = strsim::normalized_levenshtein(raw_query, title);
            match best {
                Some((_, best_ratio)) if ratio <= best_ratio => {}
                _ => best = Some((position, ratio)),
            }
        }
        match best {
            Some((position, ratio)) if ratio >= cutoff => {
                Some(self.matched(position, MatchKind::Fuzzy))
            }
            _ => None,
        }
    }

    fn matched(&self, position: usize, kind: MatchKind) -> TitleMatch {
        TitleMatch {
            position,
            matched_title: self.titles[position].clone(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> TitleIndex {
        TitleIndex::build(vec![
            "1984".to_string(),
            "Animal Farm".to_string(),
            "The Hobbit".to_string(),
            "Brave New World".to_string(),
            "Fahrenheit 451".to_string(),
            "Harry Potter".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Harry Potter"), "harry potter");
        assert_eq!(normalize_title("  Multiple   Spaces  "), "multiple spaces");
        assert_eq!(normalize_title("   "), "");
    }

    #[test]
    fn test_build_rejects_empty_sequence() {
        assert!(matches!(
            TitleIndex::build(Vec::new()),
            Err(MatchError::EmptyIndex)
        ));
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let index = sample_index();
        let m = index.resolve("harry potter").unwrap();
        assert_eq!(m.position, 5);
        assert_eq!(m.matched_title, "Harry Potter");
        assert_eq!(m.kind, MatchKind::Exact);
    }

    #[test]
    fn test_exact_match_lowest_position_wins() {
        let index = TitleIndex::build(vec![
            "Dune".to_string(),
            "Emma".to_string(),
            "Dune".to_string(),
        ])
        .unwrap();
        let m = index.resolve("dune").unwrap();
        assert_eq!(m.position, 0);
    }

    #[test]
    fn test_substring_match_first_in_index_order() {
        let index = sample_index();
        let m = index.resolve("new world").unwrap();
        assert_eq!(m.position, 3);
        assert_eq!(m.matched_title, "Brave New World");
        assert_eq!(m.kind, MatchKind::Substring);
    }

    #[test]
    fn test_exact_beats_substring() {
        // "1984" is both an exact title and a substring of nothing else here,
        // but a query equal to a full title must always report Exact.
        let index = sample_index();
        let m = index.resolve("1984").unwrap();
        assert_eq!(m.kind, MatchKind::Exact);
    }

    #[test]
    fn test_fuzzy_match_misspelling() {
        let index = sample_index();
        // "hary poter" has no exact or substring hit; the closest raw title
        // is "Harry Potter" with a ratio comfortably above the 0.6 cutoff.
        let m = index.resolve("hary poter").unwrap();
        assert_eq!(m.position, 5);
        assert_eq!(m.matched_title, "Harry Potter");
        assert_eq!(m.kind, MatchKind::Fuzzy);
    }

    #[test]
    fn test_fuzzy_below_cutoff_is_not_found() {
        let index = sample_index();
        assert!(index.resolve("zzzzqqqqxxxx").is_none());
    }

    #[test]
    fn test_cutoff_is_overridable() {
        let index = sample_index();
        // With an impossibly strict cutoff even a near-miss must fail.
        assert!(index.resolve_with_cutoff("hary poter", 0.99).is_none());
        // With a permissive cutoff the best candidate is returned.
        let m = index.resolve_with_cutoff("hary poter", 0.1).unwrap();
        assert_eq!(m.position, 5);
    }

    #[test]
    fn test_empty_query_returns_none() {
        let index = sample_index();
        assert!(index.resolve("").is_none());
        assert!(index.resolve("   ").is_none());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let index = sample_index();
        let a = index.resolve("the hobbit").unwrap();
        let b = index.resolve("the hobbit").unwrap();
        assert_eq!(a, b);
    }
}
