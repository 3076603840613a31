//! Similarity matrix and top-K ranking.
//!
//! The similarity matrix is a dense N×N table of item-item scores produced
//! by the training pipeline, row-aligned with the title index. Ranking a
//! position scans its row, excludes the item itself, and returns the top-K
//! scored positions in a deterministic order.

use thiserror::Error;

/// Errors that can occur during matrix construction or ranking.
#[derive(Debug, Error)]
pub enum RankError {
    /// Row lengths disagree with the number of rows
    #[error("Similarity matrix is not square: {rows} rows but row {row} has {cols} columns")]
    NotSquare {
        /// Total number of rows
        rows: usize,
        /// Index of the offending row
        row: usize,
        /// Length of the offending row
        cols: usize,
    },

    /// The ranked position does not exist in the matrix
    #[error("Position {position} is out of bounds for a matrix of {len} items")]
    PositionOutOfBounds {
        /// The requested position
        position: usize,
        /// Number of items in the matrix
        len: usize,
    },
}

/// Result type for ranking operations.
pub type RankResult<T> = Result<T, RankError>;

/// One ranked item: its index position and similarity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPosition {
    /// Position into the title index
    pub position: usize,

    /// Similarity score of this item to the query item
    pub score: f32,
}

/// Dense row-major item-item similarity matrix.
///
/// Entry `(i, j)` is the similarity of item `i` to item `j`. Symmetry is not
/// required. The self-similarity entry `(i, i)` is present in the data but
/// always excluded from ranking output. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    /// Row-major scores, `n * n` entries
    scores: Vec<f32>,

    /// Number of items
    n: usize,
}

impl SimilarityMatrix {
    /// Build a matrix from parsed artifact rows, validating squareness.
    ///
    /// # Errors
    /// Returns `RankError::NotSquare` if any row's length differs from the
    /// row count.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> RankResult<Self> {
        let n = rows.len();
        let mut scores = Vec::with_capacity(n * n);
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(RankError::NotSquare {
                    rows: n,
                    row: row_idx,
                    cols: row.len(),
                });
            }
            scores.extend(row);
        }
        Ok(Self { scores, n })
    }

    /// Number of items covered by the matrix.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the matrix covers zero items.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// The similarity row for one item.
    fn row(&self, position: usize) -> &[f32] {
        &self.scores[position * self.n..(position + 1) * self.n]
    }

    /// Return the `top_k` most similar other items for `position`.
    ///
    /// Output is ordered by score descending; equal scores break ties by
    /// ascending position, so the ranking is deterministic. `position`
    /// itself is never included. Pure function, no mutation of the matrix.
    ///
    /// # Errors
    /// Returns `RankError::PositionOutOfBounds` if `position >= len()`.
    /// Given correct resolver output this indicates an internal defect.
    pub fn rank(&self, position: usize, top_k: usize) -> RankResult<Vec<ScoredPosition>> {
        if position >= self.n {
            return Err(RankError::PositionOutOfBounds {
                position,
                len: self.n,
            });
        }

        let mut ranked: Vec<ScoredPosition> = self
            .row(position)
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != position)
            .map(|(other, &score)| ScoredPosition {
                position: other,
                score,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.position.cmp(&b.position))
        });
        ranked.truncate(top_k);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> SimilarityMatrix {
        // Row 1: self-similarity 1.0 at (1,1), then 0.9 / 0.5 / 0.5 / 0.1
        SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.2, 0.3, 0.4, 0.5],
            vec![0.9, 1.0, 0.5, 0.5, 0.1],
            vec![0.3, 0.5, 1.0, 0.2, 0.6],
            vec![0.4, 0.5, 0.2, 1.0, 0.7],
            vec![0.5, 0.1, 0.6, 0.7, 1.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let err = SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![0.5]]).unwrap_err();
        assert!(matches!(err, RankError::NotSquare { row: 1, cols: 1, .. }));
    }

    #[test]
    fn test_rank_excludes_self_even_at_max_score() {
        let m = sample_matrix();
        let ranked = m.rank(1, 4).unwrap();
        assert_eq!(ranked.len(), 4);
        assert!(ranked.iter().all(|s| s.position != 1));
    }

    #[test]
    fn test_rank_orders_by_score_then_position() {
        let m = sample_matrix();
        let ranked = m.rank(1, 4).unwrap();
        // Scores for row 1 excluding self: (0, 0.9), (2, 0.5), (3, 0.5), (4, 0.1).
        // The 0.5 tie must break toward the lower position.
        let positions: Vec<usize> = ranked.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 2, 3, 4]);
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_rank_truncates_to_top_k() {
        let m = sample_matrix();
        assert_eq!(m.rank(0, 2).unwrap().len(), 2);
        // top_k larger than available items returns everything but self
        assert_eq!(m.rank(0, 100).unwrap().len(), 4);
    }

    #[test]
    fn test_rank_out_of_bounds() {
        let m = sample_matrix();
        let err = m.rank(5, 4).unwrap_err();
        assert!(matches!(
            err,
            RankError::PositionOutOfBounds { position: 5, len: 5 }
        ));
    }

    #[test]
    fn test_rank_is_pure() {
        let m = sample_matrix();
        let first = m.rank(2, 3).unwrap();
        let second = m.rank(2, 3).unwrap();
        assert_eq!(first, second);
    }
}
