//! Recommendation facades.
//!
//! This module orchestrates the resolver, ranker, and enricher behind the
//! two public features: similar-books lookup and the precomputed Top-10
//! list. Both share one [`ArtifactCache`] handle, so the expensive artifact
//! load happens once per session regardless of which feature runs first.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use book_recommend::artifacts::{ArtifactCache, ArtifactPaths};
//! use book_recommend::recommend::{Recommender, SIMILAR_TOP_K};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(ArtifactCache::new(ArtifactPaths::in_model_dir(Path::new("model"))));
//! let recommender = Recommender::new(cache);
//!
//! let similar = recommender.recommend("harry potter", SIMILAR_TOP_K).await?;
//! println!("showing recommendations for {}", similar.matched.matched_title);
//! for record in &similar.records {
//!     println!("{} - {}", record.title, record.author);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::artifacts::{ArtifactCache, ArtifactError};
use crate::catalog;
use crate::models::{RecommendationRecord, TitleMatch, TopEntry};
use crate::ranking::RankError;

/// Default number of similar books returned by [`Recommender::recommend`].
pub const SIMILAR_TOP_K: usize = 4;

/// Default length of the popularity list returned by [`Recommender::top`].
pub const TOP_LIST_SIZE: usize = 10;

/// Errors surfaced by the recommendation facades.
#[derive(Debug, Error)]
pub enum RecommendError {
    /// No catalog title resolved from the query; callers should present
    /// "no match" rather than an empty list
    #[error("No catalog title matches {0:?}")]
    TitleNotFound(String),

    /// Artifact loading failed; the feature stays disabled until a retry
    /// succeeds
    #[error(transparent)]
    Artifacts(#[from] ArtifactError),

    /// Internal ranker misuse; indicates a defect, not bad user input
    #[error(transparent)]
    Rank(#[from] RankError),
}

/// Result type for facade operations.
pub type RecommendResult<T> = Result<T, RecommendError>;

/// A resolved similar-books answer.
///
/// Carries the resolver's match alongside the enriched records so the
/// caller can tell the user which title the recommendations are for when
/// the match differs from the literal query.
#[derive(Debug, Clone)]
pub struct Recommendations {
    /// The title the query resolved to
    pub matched: TitleMatch,

    /// Enriched records, best match first
    pub records: Vec<RecommendationRecord>,
}

/// Orchestration entry point for both recommendation features.
///
/// Holds a shared handle to the session's artifact cache; cheap to clone
/// into whatever task needs it.
#[derive(Debug, Clone)]
pub struct Recommender {
    cache: Arc<ArtifactCache>,
}

impl Recommender {
    /// Create a facade over a session's artifact cache.
    pub fn new(cache: Arc<ArtifactCache>) -> Self {
        Self { cache }
    }

    /// Similar-books lookup: resolve the query, rank by similarity, enrich.
    ///
    /// # Errors
    /// - `RecommendError::TitleNotFound` when no tier of the resolver
    ///   matches; this short-circuits before ranking.
    /// - `RecommendError::Artifacts` when the session artifacts cannot be
    ///   loaded; every later call retries the load.
    pub async fn recommend(&self, query: &str, top_k: usize) -> RecommendResult<Recommendations> {
        let artifacts = self.cache.get().await?;

        let matched = artifacts
            .index
            .resolve(query)
            .ok_or_else(|| RecommendError::TitleNotFound(query.to_string()))?;
        debug!(
            query,
            matched = %matched.matched_title,
            position = matched.position,
            kind = ?matched.kind,
            "title resolved"
        );

        let ranked = artifacts.matrix.rank(matched.position, top_k)?;
        let positions: Vec<usize> = ranked.iter().map(|s| s.position).collect();
        let records = catalog::enrich(&positions, &artifacts.index, &artifacts.catalog_sources());

        Ok(Recommendations { matched, records })
    }

    /// The first `k` rows of the popularity table, covers backfilled.
    ///
    /// The table arrives pre-sorted and is never re-sorted here; `k` larger
    /// than the table returns every row without error. The popularity row's
    /// own cover URL wins; the catalog sources backfill when it is empty.
    pub async fn top(&self, k: usize) -> RecommendResult<Vec<TopEntry>> {
        let artifacts = self.cache.get().await?;
        let sources = artifacts.catalog_sources();

        let entries = artifacts
            .popular
            .iter()
            .take(k)
            .map(|row| {
                let image_url = if row.image_url.trim().is_empty() {
                    catalog::first_image_url(&row.title, &sources)
                } else {
                    row.image_url.clone()
                };
                TopEntry {
                    record: RecommendationRecord {
                        title: row.title.clone(),
                        author: row.author.clone(),
                        image_url,
                    },
                    num_ratings: row.num_ratings,
                    avg_rating: row.avg_rating,
                }
            })
            .collect();
        Ok(entries)
    }
}
