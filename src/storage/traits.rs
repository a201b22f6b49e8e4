//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::BookRecord;
use crate::storage::{RunRecord, RunStatus, StoredBook};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Record count {0} does not fit an integer id")]
    TooManyRecords(usize),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawler only needs [`Storage::replace_books`]; the read methods serve
/// the API and the CLI reports.
pub trait Storage {
    // ===== Record Set =====

    /// Replaces the entire record set with `records`
    ///
    /// Ids `1..=N` are assigned in slice order. An empty slice is a no-op and
    /// leaves the existing rows untouched. The replacement is atomic: on error
    /// the previous rows remain.
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn replace_books(&mut self, records: &[BookRecord]) -> StorageResult<usize>;

    /// Lists every stored book ordered by id
    fn list_books(&self) -> StorageResult<Vec<StoredBook>>;

    /// Gets one book by id
    fn get_book(&self, id: i64) -> StorageResult<Option<StoredBook>>;

    /// Case-insensitive substring search; `None` filters match everything
    fn search_books(
        &self,
        title: Option<&str>,
        category: Option<&str>,
    ) -> StorageResult<Vec<StoredBook>>;

    /// Distinct categories, sorted
    fn list_categories(&self) -> StorageResult<Vec<String>>;

    /// Counts stored books
    fn count_books(&self) -> StorageResult<u64>;

    /// Book counts per category, largest first
    fn count_by_category(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Checks that the database answers queries
    fn ping(&self) -> StorageResult<()>;

    // ===== Run Management =====

    /// Creates a new run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run finished with its final status
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        records: usize,
        error: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
