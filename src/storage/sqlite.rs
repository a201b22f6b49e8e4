//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::BookRecord;
use crate::storage::schema::{initialize_schema, BOOKS_TABLE};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredBook};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const BOOK_COLUMNS: &str = "id, category, title, description, price, tax, availability";
const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, records, error";

/// SQLite storage backend
///
/// The connection is closed when the value is dropped, so scoping a
/// `SqliteStorage` to a block releases the database handle on every exit path.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        // WAL keeps readers on the last committed table while a replace runs
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<StoredBook> {
    Ok(StoredBook {
        id: row.get(0)?,
        record: BookRecord {
            category: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            price: row.get(4)?,
            tax: row.get(5)?,
            availability: row.get(6)?,
        },
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        records: row.get::<_, i64>(5)? as u64,
        error: row.get(6)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Record Set =====

    fn replace_books(&mut self, records: &[BookRecord]) -> StorageResult<usize> {
        if records.is_empty() {
            tracing::warn!(
                "No records to persist, leaving table '{}' unchanged",
                BOOKS_TABLE
            );
            return Ok(0);
        }

        // Dropping the transaction without commit rolls it back
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM books", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO books (id, category, title, description, price, tax, availability)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for (index, record) in records.iter().enumerate() {
                let id = i64::try_from(index + 1)
                    .map_err(|_| StorageError::TooManyRecords(records.len()))?;
                stmt.execute(params![
                    id,
                    record.category,
                    record.title,
                    record.description,
                    record.price,
                    record.tax,
                    record.availability
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            "Replaced table '{}' with {} records",
            BOOKS_TABLE,
            records.len()
        );
        Ok(records.len())
    }

    fn list_books(&self) -> StorageResult<Vec<StoredBook>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM books ORDER BY id", BOOK_COLUMNS))?;

        let books = stmt
            .query_map([], book_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(books)
    }

    fn get_book(&self, id: i64) -> StorageResult<Option<StoredBook>> {
        let book = self
            .conn
            .query_row(
                &format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS),
                params![id],
                book_from_row,
            )
            .optional()?;

        Ok(book)
    }

    fn search_books(
        &self,
        title: Option<&str>,
        category: Option<&str>,
    ) -> StorageResult<Vec<StoredBook>> {
        // SQLite's lower() folds ASCII only; fold in Rust instead
        let title = title.map(str::to_lowercase);
        let category = category.map(str::to_lowercase);
        let matches = |value: &str, needle: &Option<String>| {
            needle
                .as_deref()
                .map_or(true, |needle| value.to_lowercase().contains(needle))
        };

        let books = self
            .list_books()?
            .into_iter()
            .filter(|book| {
                matches(&book.record.title, &title) && matches(&book.record.category, &category)
            })
            .collect();

        Ok(books)
    }

    fn list_categories(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT category FROM books ORDER BY category")?;

        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(categories)
    }

    fn count_books(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_category(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) FROM books
             GROUP BY category ORDER BY COUNT(*) DESC, category",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    fn ping(&self) -> StorageResult<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        records: usize,
        error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, records = ?3, error = ?4
             WHERE id = ?5",
            params![status.to_db_string(), now, records as i64, error, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM crawl_runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM crawl_runs ORDER BY id DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }
}
