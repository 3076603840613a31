//! SQLite loan-intent storage implementation.
//!
//! Uses rusqlite over a mutex-guarded connection; none of the statements
//! hold the lock across an await point, so the store stays usable behind
//! the async trait from any task.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::{LoanStore, StorageError, StorageResult};
use crate::models::LoanIntent;

/// Longest stored title or author, in characters.
const TEXT_FIELD_MAX: usize = 255;

/// Longest stored image URL, in characters.
const URL_FIELD_MAX: usize = 500;

/// SQLite-backed loan-intent store.
///
/// The `books` table is owned by the catalog-management side; this store
/// only reads it. Notifications are append-only: created here, consumed by
/// the admin workflow, never mutated by the core.
pub struct SqliteLoanStore {
    conn: Mutex<Connection>,
}

impl SqliteLoanStore {
    /// Open a store over a database file.
    ///
    /// # Errors
    /// Returns `StorageError::Connection` if the file cannot be opened.
    pub fn open(db_path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store, used by tests and tooling.
    ///
    /// # Errors
    /// Returns `StorageError::Connection` if the connection cannot be made.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert one catalog row. Seeding helper for tooling and tests; the
    /// member/book CRUD screens own catalog writes in production.
    pub fn add_book(&self, name: &str, author: &str) -> StorageResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO books (book_name, author) VALUES (?1, ?2)",
            params![name, author],
        )
        .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    fn truncate_chars(text: &str, max: usize) -> String {
        text.chars().take(max).collect()
    }
}

#[async_trait]
impl LoanStore for SqliteLoanStore {
    async fn initialize(&self) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS books (
                 book_id   INTEGER PRIMARY KEY AUTOINCREMENT,
                 book_name TEXT NOT NULL,
                 author    TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS user_notifications (
                 notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
                 user_id     TEXT NOT NULL,
                 book_id     INTEGER NOT NULL,
                 book_title  TEXT NOT NULL,
                 book_author TEXT NOT NULL,
                 image_url   TEXT NOT NULL DEFAULT '',
                 created_at  TEXT NOT NULL DEFAULT (datetime('now'))
             );
             CREATE INDEX IF NOT EXISTS idx_notifications_user
                 ON user_notifications (user_id);",
        )
        .map_err(|e| StorageError::Query(e.to_string()))
    }

    async fn find_book_id(&self, title: &str, author: &str) -> StorageResult<i64> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT book_id, book_name, author FROM books
                 WHERE LOWER(book_name) = LOWER(?1) AND LOWER(author) = LOWER(?2)
                 ORDER BY book_id",
            )
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let candidates: Vec<(i64, String, String)> = stmt
            .query_map(params![title, author], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|e| StorageError::Query(e.to_string()))?
            .collect::<Result<_, _>>()
            .map_err(|e| StorageError::Query(e.to_string()))?;

        if candidates.is_empty() {
            return Err(StorageError::BookNotFound {
                title: title.to_string(),
                author: author.to_string(),
            });
        }

        // Ambiguous case-insensitive match: refine case-sensitively, then
        // first row wins among whatever remains.
        if candidates.len() > 1 {
            warn!(
                title,
                author,
                candidates = candidates.len(),
                "ambiguous catalog match while recording loan intent"
            );
            if let Some((id, _, _)) = candidates
                .iter()
                .find(|(_, name, by)| name == title && by == author)
            {
                return Ok(*id);
            }
        }
        Ok(candidates[0].0)
    }

    async fn record_intent(&self, intent: &LoanIntent) -> StorageResult<i64> {
        let book_id = self.find_book_id(&intent.title, &intent.author).await?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_notifications
                 (user_id, book_id, book_title, book_author, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
            params![
                intent.member_id,
                book_id,
                Self::truncate_chars(&intent.title, TEXT_FIELD_MAX),
                Self::truncate_chars(&intent.author, TEXT_FIELD_MAX),
                Self::truncate_chars(&intent.image_url, URL_FIELD_MAX),
            ],
        )
        .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    async fn count_intents(&self, member_id: Option<&str>) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = match member_id {
            Some(member) => conn
                .query_row(
                    "SELECT COUNT(*) FROM user_notifications WHERE user_id = ?1",
                    params![member],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StorageError::Query(e.to_string()))?
                .unwrap_or(0),
            None => conn
                .query_row("SELECT COUNT(*) FROM user_notifications", [], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(|e| StorageError::Query(e.to_string()))?
                .unwrap_or(0),
        };
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_store() -> SqliteLoanStore {
        let store = SqliteLoanStore::open_in_memory().unwrap();
        store.initialize().await.unwrap();
        store.add_book("Dune", "Frank Herbert").unwrap();
        store.add_book("Emma", "Jane Austen").unwrap();
        store
    }

    fn intent(title: &str, author: &str) -> LoanIntent {
        LoanIntent {
            member_id: "m-42".to_string(),
            title: title.to_string(),
            author: author.to_string(),
            image_url: "http://covers/x.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = SqliteLoanStore::open_in_memory().unwrap();
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn test_record_intent_case_insensitive_lookup() {
        let store = seeded_store().await;
        let id = store
            .record_intent(&intent("dune", "FRANK HERBERT"))
            .await
            .unwrap();
        assert!(id > 0);
        assert_eq!(store.count_intents(Some("m-42")).await.unwrap(), 1);
        assert_eq!(store.count_intents(Some("someone-else")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_book_is_rejected() {
        let store = seeded_store().await;
        let err = store
            .record_intent(&intent("No Such Book", "Nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BookNotFound { .. }));
        assert_eq!(store.count_intents(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ambiguous_match_refined_case_sensitively() {
        let store = seeded_store().await;
        // Two rows that collide case-insensitively; the exact-cased one
        // must win even though it has the higher id.
        let first = store.add_book("THE TRIAL", "FRANZ KAFKA").unwrap();
        let exact = store.add_book("The Trial", "Franz Kafka").unwrap();
        assert!(exact > first);

        let found = store.find_book_id("The Trial", "Franz Kafka").await.unwrap();
        assert_eq!(found, exact);
    }

    #[tokio::test]
    async fn test_ambiguous_without_exact_casing_first_row_wins() {
        let store = seeded_store().await;
        let first = store.add_book("THE CASTLE", "FRANZ KAFKA").unwrap();
        store.add_book("The CASTLE", "Franz KAFKA").unwrap();

        let found = store.find_book_id("the castle", "franz kafka").await.unwrap();
        assert_eq!(found, first);
    }

    #[tokio::test]
    async fn test_long_fields_are_truncated() {
        let store = seeded_store().await;
        let long_title = format!("{}une", "D".repeat(300));
        store.add_book(&long_title, "Frank Herbert").unwrap();

        let id = store
            .record_intent(&intent(&long_title, "Frank Herbert"))
            .await
            .unwrap();

        let conn = store.conn.lock().unwrap();
        let stored: String = conn
            .query_row(
                "SELECT book_title FROM user_notifications WHERE notification_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored.chars().count(), 255);
    }

    #[tokio::test]
    async fn test_notification_row_carries_timestamp() {
        let store = seeded_store().await;
        let id = store
            .record_intent(&intent("Emma", "Jane Austen"))
            .await
            .unwrap();

        let conn = store.conn.lock().unwrap();
        let created_at: String = conn
            .query_row(
                "SELECT created_at FROM user_notifications WHERE notification_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!created_at.is_empty());
    }
}
