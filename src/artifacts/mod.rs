//! Model artifact loading and the per-session artifact cache.
//!
//! The recommendation features run off four precomputed artifacts written by
//! the training pipeline, plus an optional supplementary catalog CSV used to
//! backfill missing cover URLs:
//!
//! - `popular.csv`: the popularity table, pre-sorted, first K rows are the
//!   "Top 10" set
//! - `pivot_titles.csv`: one title per row, row order defines the matrix
//!   row/column order
//! - `books.csv`: the merged catalog (title, author, three cover columns)
//! - `similarity_scores.csv`: headerless dense N×N float matrix
//! - `Books.csv` (optional): raw import catalog, consulted after the
//!   merged one during enrichment
//!
//! Loading is an expensive, I/O-bound, once-per-session operation. The
//! [`ArtifactCache`] owns the loaded structures for the lifetime of a
//! session: the first request triggers the load off the caller's thread, a
//! failed load stays unloaded so the next request retries, and once loaded
//! the structures are immutable and shared.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::catalog::{BookCatalog, BookRow};
use crate::matching::{MatchError, TitleIndex};
use crate::models::PopularEntry;
use crate::ranking::{RankError, SimilarityMatrix};

/// Errors that can occur while loading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// One or more artifact files are absent; every missing path is listed
    #[error("Missing artifact file(s): {}", .0.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    MissingFiles(Vec<PathBuf>),

    /// Reading an artifact file failed
    #[error("Failed to read artifact: {0}")]
    Io(#[from] std::io::Error),

    /// A tabular artifact could not be parsed
    #[error("Failed to parse artifact {}: {}", path.display(), source)]
    Csv {
        /// The offending file
        path: PathBuf,
        /// Underlying CSV error
        source: csv::Error,
    },

    /// A similarity score was not a number
    #[error("Malformed similarity matrix at row {row}, column {col}: {value:?}")]
    MalformedScore {
        /// Zero-based row in the matrix file
        row: usize,
        /// Zero-based column in the matrix file
        col: usize,
        /// The unparseable field
        value: String,
    },

    /// The pivot artifact held no titles
    #[error(transparent)]
    EmptyTitles(#[from] MatchError),

    /// The similarity matrix was not square
    #[error(transparent)]
    Matrix(#[from] RankError),

    /// Matrix size disagrees with the pivot title count
    #[error("Artifacts misaligned: {titles} pivot titles but a {matrix}x{matrix} similarity matrix")]
    Misaligned {
        /// Number of pivot titles
        titles: usize,
        /// Matrix dimension
        matrix: usize,
    },

    /// The background load task was cancelled or panicked
    #[error("Artifact load task failed: {0}")]
    TaskFailed(String),
}

/// Result type for artifact operations.
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// One row of the popularity artifact, column names as written by the
/// training pipeline.
#[derive(Debug, Deserialize)]
struct PopularRow {
    #[serde(rename = "Book-Title")]
    title: String,

    #[serde(rename = "Book-Author", default)]
    author: String,

    num_ratings: u32,

    avg_rating: f32,

    #[serde(rename = "Image-URL-M", default)]
    image_url: String,
}

/// One row of the pivot artifact: just the title column.
#[derive(Debug, Deserialize)]
struct PivotRow {
    #[serde(rename = "Book-Title")]
    title: String,
}

/// Locations of the artifact files for one session.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// Popularity table
    pub popular: PathBuf,

    /// Pivot title sequence
    pub pivot_titles: PathBuf,

    /// Merged catalog
    pub books: PathBuf,

    /// Dense similarity matrix
    pub similarity: PathBuf,

    /// Optional raw import catalog for cover backfill
    pub supplement: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Conventional file names inside a model directory.
    pub fn in_model_dir(dir: &Path) -> Self {
        Self {
            popular: dir.join("popular.csv"),
            pivot_titles: dir.join("pivot_titles.csv"),
            books: dir.join("books.csv"),
            similarity: dir.join("similarity_scores.csv"),
            supplement: None,
        }
    }

    /// Attach a supplementary catalog CSV.
    pub fn with_supplement(mut self, path: PathBuf) -> Self {
        self.supplement = Some(path);
        self
    }

    /// Every required path that does not exist on disk.
    fn missing(&self) -> Vec<PathBuf> {
        [
            &self.popular,
            &self.pivot_titles,
            &self.books,
            &self.similarity,
        ]
        .into_iter()
        .filter(|p| !p.exists())
        .cloned()
        .collect()
    }
}

/// The loaded, immutable artifact set for one session.
///
/// Owned jointly by the facades through an `Arc`; safe to read from any
/// number of concurrent lookups once loaded.
#[derive(Debug)]
pub struct Artifacts {
    /// Normalized title lookup, position-aligned with the matrix
    pub index: TitleIndex,

    /// Item-item similarity scores
    pub matrix: SimilarityMatrix,

    /// Popularity table in artifact order
    pub popular: Vec<PopularEntry>,

    /// Merged catalog, first enrichment source
    pub books: BookCatalog,

    /// Raw import catalog, second enrichment source when configured
    pub supplement: Option<BookCatalog>,
}

impl Artifacts {
    /// Load and validate every artifact from `paths`.
    ///
    /// Synchronous and I/O-bound; run it off the interaction thread (the
    /// [`ArtifactCache`] does) so the caller is not blocked.
    ///
    /// # Errors
    /// Returns `ArtifactError::MissingFiles` listing every absent required
    /// file, or a parse/validation error for the first bad artifact.
    pub fn load(paths: &ArtifactPaths) -> ArtifactResult<Self> {
        let missing = paths.missing();
        if !missing.is_empty() {
            return Err(ArtifactError::MissingFiles(missing));
        }

        let popular = load_popular(&paths.popular)?;
        let titles = load_pivot_titles(&paths.pivot_titles)?;
        let matrix = load_matrix(&paths.similarity)?;
        let books = BookCatalog::from_rows(load_book_rows(&paths.books)?);

        let supplement = match &paths.supplement {
            Some(path) if path.exists() => {
                Some(BookCatalog::from_rows(load_book_rows(path)?))
            }
            Some(path) => {
                // The supplement only backfills covers; a missing file is
                // logged and skipped rather than failing the session.
                warn!(path = %path.display(), "supplementary catalog not found, skipping");
                None
            }
            None => None,
        };

        let index = TitleIndex::build(titles)?;
        if matrix.len() != index.len() {
            return Err(ArtifactError::Misaligned {
                titles: index.len(),
                matrix: matrix.len(),
            });
        }

        info!(
            titles = index.len(),
            popular = popular.len(),
            books = books.len(),
            supplement = supplement.as_ref().map(|c| c.len()).unwrap_or(0),
            "artifacts loaded"
        );

        Ok(Self {
            index,
            matrix,
            popular,
            books,
            supplement,
        })
    }

    /// Enrichment sources in precedence order: merged catalog first, raw
    /// import second.
    pub fn catalog_sources(&self) -> Vec<&BookCatalog> {
        let mut sources = vec![&self.books];
        if let Some(supplement) = &self.supplement {
            sources.push(supplement);
        }
        sources
    }
}

fn load_popular(path: &Path) -> ArtifactResult<Vec<PopularEntry>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ArtifactError::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut entries = Vec::new();
    for record in reader.deserialize::<PopularRow>() {
        let row = record.map_err(|e| ArtifactError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        entries.push(PopularEntry {
            title: row.title,
            author: row.author,
            num_ratings: row.num_ratings,
            avg_rating: row.avg_rating,
            image_url: row.image_url,
        });
    }
    debug!(rows = entries.len(), path = %path.display(), "popularity table read");
    Ok(entries)
}

fn load_pivot_titles(path: &Path) -> ArtifactResult<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ArtifactError::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut titles = Vec::new();
    for record in reader.deserialize::<PivotRow>() {
        let row = record.map_err(|e| ArtifactError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        titles.push(row.title);
    }
    Ok(titles)
}

fn load_book_rows(path: &Path) -> ArtifactResult<Vec<BookRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ArtifactError::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<BookRow>() {
        rows.push(record.map_err(|e| ArtifactError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?);
    }
    Ok(rows)
}

fn load_matrix(path: &Path) -> ArtifactResult<SimilarityMatrix> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| ArtifactError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut rows: Vec<Vec<f32>> = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ArtifactError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut row = Vec::with_capacity(record.len());
        for (col_idx, field) in record.iter().enumerate() {
            let score = field
                .trim()
                .parse::<f32>()
                .map_err(|_| ArtifactError::MalformedScore {
                    row: row_idx,
                    col: col_idx,
                    value: field.to_string(),
                })?;
            row.push(score);
        }
        rows.push(row);
    }
    Ok(SimilarityMatrix::from_rows(rows)?)
}

/// Load-once artifact cache for one session.
///
/// Replaces the process-wide loaded-flag of a typical desktop app with an
/// explicit session object: constructed once, passed by handle into the
/// facades. The first `get` performs the load on a blocking worker thread;
/// concurrent callers wait for that one load. A failed load leaves the cache
/// unloaded, so every subsequent call surfaces a fresh load attempt until
/// one succeeds.
#[derive(Debug)]
pub struct ArtifactCache {
    paths: ArtifactPaths,
    cell: OnceCell<Arc<Artifacts>>,
}

impl ArtifactCache {
    /// Create an unloaded cache over the given artifact locations.
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            cell: OnceCell::new(),
        }
    }

    /// The loaded artifact set, loading it on first use.
    ///
    /// # Errors
    /// Returns the load failure; the cache stays unloaded and the next call
    /// retries.
    pub async fn get(&self) -> ArtifactResult<Arc<Artifacts>> {
        let artifacts = self
            .cell
            .get_or_try_init(|| async {
                let paths = self.paths.clone();
                tokio::task::spawn_blocking(move || Artifacts::load(&paths).map(Arc::new))
                    .await
                    .map_err(|e| ArtifactError::TaskFailed(e.to_string()))?
            })
            .await?;
        Ok(Arc::clone(artifacts))
    }

    /// Whether a load has already succeeded.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}
