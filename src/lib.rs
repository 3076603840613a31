//! Book recommendation core for the library management system.
//!
//! This library implements the recommendation and lookup features that sit
//! behind the desktop application's user screens: free-text title
//! resolution, item-item similarity ranking, catalog enrichment with cover
//! precedence, the precomputed Top-10 list, cover downloading with a disk
//! cache, and loan-intent recording.
//!
//! # Architecture
//!
//! The system is organized into several key modules:
//!
//! - **models**: Core data structures (CatalogItem, RecommendationRecord, etc.)
//! - **matching**: Title index construction and three-tier title resolution
//! - **ranking**: Dense similarity matrix and top-K ranking
//! - **catalog**: Metadata sources and result enrichment
//! - **artifacts**: Model artifact loading and the per-session cache
//! - **recommend**: The similar-books and Top-10 facades
//! - **covers**: Cover-image fetching with disk cache and placeholder fallback
//! - **storage**: Loan-intent persistence (SQLite-based)
//! - **predict**: Holding-duration predictor interface (external service)
//!
//! # Workflow
//!
//! 1. Build an [`artifacts::ArtifactCache`] over the model directory;
//!    artifacts load lazily on the first request, off the calling thread.
//! 2. Hand the cache to a [`recommend::Recommender`].
//! 3. `recommend(query, top_k)` resolves the query (exact → substring →
//!    fuzzy), ranks the resolved position against the similarity matrix,
//!    and enriches the result with author and cover metadata.
//! 4. `top(k)` slices the pre-sorted popularity table and enriches covers
//!    the same way.
//! 5. On user confirmation, a [`storage::LoanStore`] records the
//!    intent-to-borrow notification.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use book_recommend::artifacts::{ArtifactCache, ArtifactPaths};
//! use book_recommend::recommend::{Recommender, SIMILAR_TOP_K};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let paths = ArtifactPaths::in_model_dir(Path::new("model"));
//!     let recommender = Recommender::new(Arc::new(ArtifactCache::new(paths)));
//!
//!     let similar = recommender.recommend("harry potter", SIMILAR_TOP_K).await?;
//!     for record in &similar.records {
//!         println!("{} - {}", record.title, record.author);
//!     }
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod catalog;
pub mod covers;
pub mod matching;
pub mod models;
pub mod predict;
pub mod ranking;
pub mod recommend;
pub mod storage;

// Re-export commonly used types at the crate root
pub use matching::{TitleIndex, FUZZY_MATCH_CUTOFF};
pub use models::{
    CatalogItem, LoanIntent, MatchKind, PopularEntry, RecommendationRecord, TitleMatch, TopEntry,
};
pub use ranking::SimilarityMatrix;
pub use recommend::{RecommendError, Recommender, SIMILAR_TOP_K, TOP_LIST_SIZE};
pub use storage::LoanStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
