//! Loan-intent storage abstraction and implementations.
//!
//! When a user confirms interest in a recommended book, the core records an
//! intent-to-borrow notification: one relational read to resolve the chosen
//! title/author pair to a catalog identifier, then one insert. The trait
//! keeps the facades testable and allows different relational backends; the
//! shipped implementation is SQLite.

pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::LoanIntent;

/// Errors that can occur during loan-intent storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Statement execution error
    #[error("Query execution failed: {0}")]
    Query(String),

    /// No catalog entry matches the chosen title/author pair
    #[error("No catalog entry matches title {title:?} by {author:?}")]
    BookNotFound {
        /// Title the user confirmed
        title: String,
        /// Author the user confirmed
        author: String,
    },

    /// Other unexpected errors
    #[error("Unexpected storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for loan-intent storage backends.
///
/// Results and errors are surfaced verbatim to the presentation layer as
/// the final step's outcome; the core performs no automatic retry.
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Initialize the storage (create tables, indexes, etc.).
    ///
    /// Idempotent and safe to call multiple times.
    async fn initialize(&self) -> StorageResult<()>;

    /// Resolve a title/author pair to a catalog identifier.
    ///
    /// Matching is case-insensitive exact; when that is ambiguous the
    /// candidates are refined case-sensitively, and the first remaining row
    /// wins.
    ///
    /// # Errors
    /// Returns `StorageError::BookNotFound` when no catalog entry matches.
    async fn find_book_id(&self, title: &str, author: &str) -> StorageResult<i64>;

    /// Record one intent-to-borrow notification.
    ///
    /// Resolves the intent's title/author via [`find_book_id`](Self::find_book_id)
    /// and appends a notification row with the store's own timestamp.
    ///
    /// # Returns
    /// The identifier of the appended notification row.
    async fn record_intent(&self, intent: &LoanIntent) -> StorageResult<i64>;

    /// Number of recorded intents, optionally for one member.
    async fn count_intents(&self, member_id: Option<&str>) -> StorageResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Minimal in-memory store proving the trait is object-safe and usable
    // behind a dyn handle, the way the presentation layer consumes it.
    struct MemoryStore {
        books: Vec<(i64, String, String)>,
        intents: Mutex<Vec<LoanIntent>>,
    }

    #[async_trait]
    impl LoanStore for MemoryStore {
        async fn initialize(&self) -> StorageResult<()> {
            Ok(())
        }

        async fn find_book_id(&self, title: &str, author: &str) -> StorageResult<i64> {
            self.books
                .iter()
                .find(|(_, t, a)| t.eq_ignore_ascii_case(title) && a.eq_ignore_ascii_case(author))
                .map(|(id, _, _)| *id)
                .ok_or_else(|| StorageError::BookNotFound {
                    title: title.to_string(),
                    author: author.to_string(),
                })
        }

        async fn record_intent(&self, intent: &LoanIntent) -> StorageResult<i64> {
            self.find_book_id(&intent.title, &intent.author).await?;
            let mut intents = self.intents.lock().unwrap();
            intents.push(intent.clone());
            Ok(intents.len() as i64)
        }

        async fn count_intents(&self, member_id: Option<&str>) -> StorageResult<usize> {
            let intents = self.intents.lock().unwrap();
            Ok(intents
                .iter()
                .filter(|i| member_id.map_or(true, |m| i.member_id == m))
                .count())
        }
    }

    #[tokio::test]
    async fn test_trait_object_usage() {
        let store: Box<dyn LoanStore> = Box::new(MemoryStore {
            books: vec![(7, "Dune".to_string(), "Frank Herbert".to_string())],
            intents: Mutex::new(Vec::new()),
        });

        let intent = LoanIntent {
            member_id: "m-1".to_string(),
            title: "dune".to_string(),
            author: "frank herbert".to_string(),
            image_url: String::new(),
        };
        assert_eq!(store.record_intent(&intent).await.unwrap(), 1);
        assert_eq!(store.count_intents(Some("m-1")).await.unwrap(), 1);

        let missing = LoanIntent {
            title: "Unknown".to_string(),
            ..intent
        };
        assert!(matches!(
            store.record_intent(&missing).await.unwrap_err(),
            StorageError::BookNotFound { .. }
        ));
    }
}
