//! Core data models for the book recommendation system.
//!
//! This module contains the fundamental data structures used across the
//! application, including catalog metadata, resolver output, and the
//! recommendation records handed to the presentation layer.

use serde::{Deserialize, Serialize};

/// A single catalog entry after the image-precedence merge.
///
/// Catalog items are loaded once per session from the model artifacts and
/// shared read-only between the similar-books and top-10 features. The
/// `image_url` is the best cover URL found across the configured sources and
/// may be empty when no source had one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    /// Book title (unique within one catalog source)
    pub title: String,

    /// Author name
    pub author: String,

    /// Best available cover-image URL, empty when unknown
    pub image_url: String,
}

/// One row of the precomputed popularity table.
///
/// Rows arrive pre-sorted by the popularity metric the training pipeline
/// encodes; the crate never re-sorts them. The first K rows define the
/// "Top 10" set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularEntry {
    /// Book title
    pub title: String,

    /// Author name
    pub author: String,

    /// Number of ratings backing the popularity score
    pub num_ratings: u32,

    /// Average rating
    pub avg_rating: f32,

    /// Cover URL carried by the popularity artifact itself, may be empty
    pub image_url: String,
}

/// Which resolver tier produced a title match.
///
/// The tiers are tried in strict precedence order; the first hit wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchKind {
    /// Case-insensitive equality with an indexed title
    Exact,

    /// The normalized query appeared as a substring of an indexed title
    Substring,

    /// Closest edit-distance candidate above the similarity cutoff
    Fuzzy,
}

/// A resolved title: the matrix position plus the original-cased title.
///
/// `matched_title` keeps the catalog's own casing so callers can tell the
/// user "showing recommendations for X" when the match differs from what
/// they typed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleMatch {
    /// Position into the title index and similarity matrix
    pub position: usize,

    /// The catalog title that matched, in its original casing
    pub matched_title: String,

    /// Which tier produced the match
    pub kind: MatchKind,
}

impl TitleMatch {
    /// Whether the matched title differs from the user's query beyond casing.
    ///
    /// Used by callers to decide if a "showing recommendations for X" notice
    /// is worth displaying.
    pub fn differs_from(&self, query: &str) -> bool {
        !self.matched_title.eq_ignore_ascii_case(query.trim())
    }
}

/// A single recommendation handed to the presentation layer.
///
/// This is a transient view, one per ranked or listed item; it is never
/// persisted by the core. Fields may be empty when metadata lookup missed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationRecord {
    /// Book title
    pub title: String,

    /// Author name, empty when no catalog source knew the title
    pub author: String,

    /// Cover URL, empty when no source had one
    pub image_url: String,
}

/// A Top-K list entry: the recommendation record plus its popularity stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopEntry {
    /// Title/author/cover view of the row
    pub record: RecommendationRecord,

    /// Number of ratings backing the row
    pub num_ratings: u32,

    /// Average rating
    pub avg_rating: f32,
}

/// An intent-to-borrow notification, recorded when a user confirms interest
/// in a recommended book.
///
/// The store resolves the title/author pair to a catalog identifier and
/// assigns the timestamp; the core never mutates a recorded intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanIntent {
    /// Identifier of the member expressing interest
    pub member_id: String,

    /// Title of the chosen book
    pub title: String,

    /// Author of the chosen book
    pub author: String,

    /// Cover URL shown to the user at confirmation time, may be empty
    pub image_url: String,
}
