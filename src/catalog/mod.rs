//! Catalog metadata sources and result enrichment.
//!
//! Enrichment joins ranked title positions against one or more book-metadata
//! sources to attach the author and the best cover-image URL. Sources are
//! consulted in a fixed order (the merged/primary dataset first, the raw
//! import second); within one catalog row the cover URL falls back through
//! the medium, large, and small resolution columns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::matching::TitleIndex;
use crate::models::{CatalogItem, RecommendationRecord};

/// One raw catalog row as produced by the training pipeline.
///
/// Column names follow the artifact's own headers. Up to three cover URLs
/// are carried at different resolutions; [`BookRow::best_image_url`] picks
/// the preferred one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRow {
    /// Book title
    #[serde(rename = "Book-Title")]
    pub title: String,

    /// Author name
    #[serde(rename = "Book-Author", default)]
    pub author: String,

    /// Medium-resolution cover URL
    #[serde(rename = "Image-URL-M", default)]
    pub image_url_m: String,

    /// Large-resolution cover URL
    #[serde(rename = "Image-URL-L", default)]
    pub image_url_l: String,

    /// Small-resolution cover URL
    #[serde(rename = "Image-URL-S", default)]
    pub image_url_s: String,
}

impl BookRow {
    /// The best available cover URL for this row.
    ///
    /// Resolutions are tried through an ordered accessor chain, medium
    /// first, then large, then small. Returns `None` when every column is
    /// empty or whitespace.
    pub fn best_image_url(&self) -> Option<&str> {
        [&self.image_url_m, &self.image_url_l, &self.image_url_s]
            .into_iter()
            .map(|url| url.trim())
            .find(|url| !url.is_empty())
    }
}

/// One catalog source, indexed by exact title.
///
/// Duplicate titles within a source are dropped at construction; the first
/// occurrence's metadata wins, matching how the artifacts deduplicate their
/// own rows.
#[derive(Debug, Clone, Default)]
pub struct BookCatalog {
    by_title: HashMap<String, BookRow>,
}

impl BookCatalog {
    /// Build a catalog from raw rows, deduplicating by exact title.
    pub fn from_rows(rows: Vec<BookRow>) -> Self {
        let mut by_title = HashMap::with_capacity(rows.len());
        for row in rows {
            by_title.entry(row.title.clone()).or_insert(row);
        }
        Self { by_title }
    }

    /// Look up a row by exact title.
    pub fn get(&self, title: &str) -> Option<&BookRow> {
        self.by_title.get(title)
    }

    /// The merged single-URL view of a row: title, author, and the best
    /// cover this source has for it.
    pub fn item(&self, title: &str) -> Option<CatalogItem> {
        self.get(title).map(|row| CatalogItem {
            title: row.title.clone(),
            author: row.author.clone(),
            image_url: row.best_image_url().unwrap_or_default().to_string(),
        })
    }

    /// Number of distinct titles in this source.
    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    /// Whether this source holds no rows.
    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}

/// The author for `title` from the first source that knows it, else empty.
pub fn first_author(title: &str, sources: &[&BookCatalog]) -> String {
    sources
        .iter()
        .find_map(|source| source.item(title))
        .map(|item| item.author)
        .unwrap_or_default()
}

/// The first non-empty cover URL for `title` across `sources` in order.
///
/// A source whose row exists but carries no usable URL does not stop the
/// scan; a later source's populated URL still wins.
pub fn first_image_url(title: &str, sources: &[&BookCatalog]) -> String {
    sources
        .iter()
        .filter_map(|source| source.item(title))
        .map(|item| item.image_url)
        .find(|url| !url.is_empty())
        .unwrap_or_default()
}

/// Join ranked positions against the catalog sources.
///
/// Preserves the input order and length exactly: every position yields one
/// record, with empty author/image fields when no source knows the title,
/// so one bad title never aborts the whole batch.
pub fn enrich(
    positions: &[usize],
    index: &TitleIndex,
    sources: &[&BookCatalog],
) -> Vec<RecommendationRecord> {
    positions
        .iter()
        .map(|&position| {
            let title = index.title(position).unwrap_or_default().to_string();
            let author = first_author(&title, sources);
            let image_url = first_image_url(&title, sources);
            RecommendationRecord {
                title,
                author,
                image_url,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(title: &str, author: &str, m: &str, l: &str, s: &str) -> BookRow {
        BookRow {
            title: title.to_string(),
            author: author.to_string(),
            image_url_m: m.to_string(),
            image_url_l: l.to_string(),
            image_url_s: s.to_string(),
        }
    }

    fn sample_index() -> TitleIndex {
        TitleIndex::build(vec![
            "Dune".to_string(),
            "Emma".to_string(),
            "The Hobbit".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_best_image_url_resolution_order() {
        let r = row("Dune", "Frank Herbert", "", "http://l", "http://s");
        assert_eq!(r.best_image_url(), Some("http://l"));

        let r = row("Dune", "Frank Herbert", "http://m", "http://l", "http://s");
        assert_eq!(r.best_image_url(), Some("http://m"));

        let r = row("Dune", "Frank Herbert", "  ", "", "");
        assert_eq!(r.best_image_url(), None);
    }

    #[test]
    fn test_catalog_dedup_first_occurrence_wins() {
        let catalog = BookCatalog::from_rows(vec![
            row("Dune", "Frank Herbert", "http://first", "", ""),
            row("Dune", "Someone Else", "http://second", "", ""),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("Dune").unwrap().author, "Frank Herbert");
        assert_eq!(
            catalog.get("Dune").unwrap().best_image_url(),
            Some("http://first")
        );
    }

    #[test]
    fn test_enrich_preserves_order_and_length() {
        let index = sample_index();
        let primary = BookCatalog::from_rows(vec![row("Dune", "Frank Herbert", "http://m", "", "")]);
        let records = enrich(&[2, 0, 1], &index, &[&primary]);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].title, "The Hobbit");
        assert_eq!(records[1].title, "Dune");
        assert_eq!(records[2].title, "Emma");

        // Positions 2 and 1 have no metadata: empty fields, not an error.
        assert_eq!(records[0].author, "");
        assert_eq!(records[0].image_url, "");
        assert_eq!(records[1].author, "Frank Herbert");
        assert_eq!(records[1].image_url, "http://m");
    }

    #[test]
    fn test_populated_image_wins_over_earlier_empty_source() {
        let index = sample_index();
        // The primary source knows the title but has no cover; the raw
        // import carries one. The populated URL must win.
        let primary = BookCatalog::from_rows(vec![row("Dune", "Frank Herbert", "", "", "")]);
        let import = BookCatalog::from_rows(vec![row("Dune", "F. Herbert", "http://import", "", "")]);

        let records = enrich(&[0], &index, &[&primary, &import]);
        assert_eq!(records[0].image_url, "http://import");
        // Author still comes from the first source that knows the title.
        assert_eq!(records[0].author, "Frank Herbert");
    }

    #[test]
    fn test_item_applies_resolution_fallback() {
        let catalog = BookCatalog::from_rows(vec![row("Dune", "Frank Herbert", "", "http://l", "")]);
        let item = catalog.item("Dune").unwrap();
        assert_eq!(item.author, "Frank Herbert");
        assert_eq!(item.image_url, "http://l");
        assert!(catalog.item("Missing").is_none());
    }

    #[test]
    fn test_first_image_url_source_order() {
        let primary = BookCatalog::from_rows(vec![row("Dune", "Frank Herbert", "http://p", "", "")]);
        let import = BookCatalog::from_rows(vec![row("Dune", "F. Herbert", "http://i", "", "")]);
        assert_eq!(first_image_url("Dune", &[&primary, &import]), "http://p");
        assert_eq!(first_image_url("Dune", &[&import, &primary]), "http://i");
        assert_eq!(first_image_url("Missing", &[&primary, &import]), "");
    }
}
